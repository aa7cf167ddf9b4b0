//! `vpn_site`: on-premises branch sites connected to a Virtual WAN

use super::{CatalogEntry, paths, scoped_kind};
use reconcile::{ArgSpec, Compare, ParamSpec, ParamType};

pub(crate) fn entry() -> CatalogEntry {
    let args = ArgSpec::new()
        .param("virtual_wan_id", ParamSpec::str())
        .param("ip_address", ParamSpec::str().describe("Public IP of the branch device"))
        .param(
            "address_prefixes",
            ParamSpec::list(ParamType::Str).describe("Branch address space"),
        )
        .param("device_vendor", ParamSpec::str())
        .param("device_model", ParamSpec::str())
        .param("link_speed_in_mbps", ParamSpec::int())
        .param("is_security_site", ParamSpec::bool())
        .param("bgp_asn", ParamSpec::int())
        .param("bgp_peering_address", ParamSpec::str())
        .param(
            "vpn_site_links",
            ParamSpec::list(ParamType::Dict).describe("Links in ARM shape; matched by name"),
        )
        .required_together(["bgp_asn", "bgp_peering_address"])
        .mutually_exclusive(["ip_address", "vpn_site_links"]);

    let kind = scoped_kind("vpn_site", args)
        .describe("Virtual WAN VPN site")
        .bind("virtual_wan_id", "properties.virtualWan.id")
        .bind("ip_address", "properties.ipAddress")
        .bind("address_prefixes", "properties.addressSpace.addressPrefixes")
        .bind("device_vendor", "properties.deviceProperties.deviceVendor")
        .bind("device_model", "properties.deviceProperties.deviceModel")
        .bind("link_speed_in_mbps", "properties.deviceProperties.linkSpeedInMbps")
        .bind("is_security_site", "properties.isSecuritySite")
        .bind("bgp_asn", "properties.bgpProperties.asn")
        .bind("bgp_peering_address", "properties.bgpProperties.bgpPeeringAddress")
        .bind("vpn_site_links", "properties.vpnSiteLinks")
        .rule("properties.virtualWan.id", Compare::IgnoreCase)
        .rule("properties.addressSpace.addressPrefixes", Compare::Set)
        .rule("properties.vpnSiteLinks", Compare::keyed("name"))
        .returns(paths(&[
            "id",
            "name",
            "location",
            "tags",
            "properties.virtualWan",
            "properties.ipAddress",
            "properties.addressSpace",
            "properties.deviceProperties",
            "properties.bgpProperties",
            "properties.isSecuritySite",
            "properties.vpnSiteLinks",
            "properties.provisioningState",
        ]))
        .tier(2);

    CatalogEntry::new(
        kind,
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Network/vpnSites/{name}",
        "2023-05-01",
    )
}
