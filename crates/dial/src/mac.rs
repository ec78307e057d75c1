use std::fmt;

use rand::Rng;

/// An Ethernet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Random unicast, locally-administered address with a `02` first octet.
    ///
    /// The second octet stays below `0x80` so addresses never collide with the
    /// `02:80:..` range some access concentrators reserve.
    pub fn random_local() -> Self {
        let mut tail = [0u8; 5];
        rand::thread_rng().fill(&mut tail);
        let [b1, b2, b3, b4, b5] = tail;
        Self([0x02, b1 & 0x7f, b2, b3, b4, b5])
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_locally_administered(&self) -> bool {
        let [first, ..] = self.0;
        first & 0x02 != 0
    }

    pub fn is_unicast(&self) -> bool {
        let [first, ..] = self.0;
        first & 0x01 == 0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}
