use dial::NetMode;
use dial_pppd::IpLink;
use tracing::info;

use super::ConfigArgs;
use crate::config;
use crate::error::ActivatorResult;
use crate::netconf;

/// Create any VLAN sub-interface the network configuration names but the
/// kernel lacks.
pub async fn run_setup_vlans(args: ConfigArgs) -> ActivatorResult<()> {
    let config = config::load(&args.config).await?;
    let network = netconf::load(&config.network_config).await?;
    if network.mode != Some(NetMode::Vlan) {
        info!("network configuration is not in vlan mode, nothing to create");
        return Ok(());
    }

    let link = IpLink::new(config.dial.sysfs_net.clone(), config.dial.privilege);
    let mut created = 0usize;
    for handle in network.candidates()? {
        let Some(tag) = handle.vlan_tag else { continue };
        if link.exists(&handle.name).await {
            info!(iface = %handle.name, "VLAN sub-interface already exists");
            continue;
        }
        link.create_vlan(&handle.base_interface, tag).await?;
        created += 1;
    }
    info!(created, "VLAN setup finished");
    Ok(())
}
