//! `virtual_hub`: Virtual WAN hubs

use super::{CatalogEntry, paths, scoped_kind};
use reconcile::{ArgSpec, Compare, ParamSpec, ParamType};

pub(crate) fn entry() -> CatalogEntry {
    let args = ArgSpec::new()
        .param(
            "virtual_wan_id",
            ParamSpec::str().describe("Resource ID of the Virtual WAN the hub belongs to"),
        )
        .param(
            "address_prefix",
            ParamSpec::str()
                .pattern(r"[0-9]{1,3}(\.[0-9]{1,3}){3}/[0-9]{1,2}")
                .describe("Hub address space in CIDR notation"),
        )
        .param("sku", ParamSpec::str().choices(["Basic", "Standard"]).ignore_case())
        .param("allow_branch_to_branch_traffic", ParamSpec::bool())
        .param(
            "hub_routing_preference",
            ParamSpec::str()
                .choices(["ExpressRoute", "VpnGateway", "ASPath"])
                .ignore_case(),
        )
        .param("virtual_router_asn", ParamSpec::int())
        .param(
            "virtual_router_ips",
            ParamSpec::list(ParamType::Str).describe("Router IPs; order does not matter"),
        );

    let kind = scoped_kind("virtual_hub", args)
        .describe("Virtual WAN hub")
        .bind("virtual_wan_id", "properties.virtualWan.id")
        .bind("address_prefix", "properties.addressPrefix")
        .bind("sku", "properties.sku")
        .bind("allow_branch_to_branch_traffic", "properties.allowBranchToBranchTraffic")
        .bind("hub_routing_preference", "properties.hubRoutingPreference")
        .bind("virtual_router_asn", "properties.virtualRouterAsn")
        .bind("virtual_router_ips", "properties.virtualRouterIps")
        .rule("properties.virtualWan.id", Compare::IgnoreCase)
        .rule("properties.sku", Compare::IgnoreCase)
        .rule("properties.hubRoutingPreference", Compare::IgnoreCase)
        .rule("properties.virtualRouterIps", Compare::Set)
        .create_only("properties.addressPrefix")
        .create_only("properties.virtualWan.id")
        .returns(paths(&[
            "id",
            "name",
            "location",
            "tags",
            "properties.virtualWan",
            "properties.addressPrefix",
            "properties.sku",
            "properties.allowBranchToBranchTraffic",
            "properties.hubRoutingPreference",
            "properties.virtualRouterAsn",
            "properties.virtualRouterIps",
            "properties.routingState",
            "properties.provisioningState",
        ]))
        .tier(1);

    CatalogEntry::new(
        kind,
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Network/virtualHubs/{name}",
        "2023-05-01",
    )
}
