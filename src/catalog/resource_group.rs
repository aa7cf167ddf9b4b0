//! `resource_group`: the container every other built-in kind lives in

use super::{CatalogEntry, SUBSCRIPTION_PARAM, paths, with_common_params};
use reconcile::{ArgSpec, Compare, ParamSpec, ResourceKind};

pub(crate) fn entry() -> CatalogEntry {
    let args = ArgSpec::new().param(
        "managed_by",
        ParamSpec::str().describe("ID of the resource that manages this group"),
    );

    let kind = ResourceKind::new("resource_group")
        .describe("Resource group")
        .args(with_common_params(args))
        .identity_param(SUBSCRIPTION_PARAM)
        .identity_param("name")
        .with_state()
        .append_flag("append_tags", "tags")
        .bind("managed_by", "managedBy")
        .rule("location", Compare::IgnoreCase)
        .create_only("location")
        .returns(paths(&[
            "id",
            "name",
            "location",
            "tags",
            "managedBy",
            "properties.provisioningState",
        ]))
        .tier(0);

    CatalogEntry::new(
        kind,
        "/subscriptions/{subscription_id}/resourcegroups/{name}",
        "2021-04-01",
    )
}
