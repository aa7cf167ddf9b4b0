//! `managed_disk`: compute disks

use super::{CatalogEntry, paths, scoped_kind};
use reconcile::{ArgSpec, Compare, ParamSpec, ParamType, RequiredIf};

pub(crate) fn entry() -> CatalogEntry {
    let args = ArgSpec::new()
        .param(
            "storage_account_type",
            ParamSpec::str()
                .choices([
                    "Standard_LRS",
                    "StandardSSD_LRS",
                    "StandardSSD_ZRS",
                    "Premium_LRS",
                    "Premium_ZRS",
                    "UltraSSD_LRS",
                ])
                .ignore_case(),
        )
        .param(
            "create_option",
            ParamSpec::str()
                .choices(["Empty", "Import", "Copy"])
                .ignore_case(),
        )
        .param(
            "source_uri",
            ParamSpec::str()
                .alias("source_resource_uri")
                .describe("Blob URI to import or disk ID to copy from"),
        )
        .param(
            "os_type",
            ParamSpec::str().choices(["Linux", "Windows"]).ignore_case(),
        )
        .param("disk_size_gb", ParamSpec::int().describe("Size in GB; disks can grow but not shrink"))
        .param(
            "zones",
            ParamSpec::list(ParamType::Str).describe("Availability zones, in order"),
        )
        .param("max_shares", ParamSpec::int())
        .required_if(RequiredIf::new("create_option", "Import", ["source_uri"]))
        .required_if(RequiredIf::new("create_option", "Copy", ["source_uri"]));

    let kind = scoped_kind("managed_disk", args)
        .describe("Managed disk")
        .bind("storage_account_type", "sku.name")
        .bind("create_option", "properties.creationData.createOption")
        .bind("source_uri", "properties.creationData.sourceUri")
        .bind("os_type", "properties.osType")
        .bind("disk_size_gb", "properties.diskSizeGB")
        .bind("max_shares", "properties.maxShares")
        .rule("sku.name", Compare::IgnoreCase)
        .rule("properties.osType", Compare::IgnoreCase)
        .rule("zones", Compare::Sequence)
        .create_only("zones")
        .create_only("properties.creationData.createOption")
        .create_only("properties.creationData.sourceUri")
        .returns(paths(&[
            "id",
            "name",
            "location",
            "tags",
            "sku",
            "zones",
            "managedBy",
            "properties.diskSizeGB",
            "properties.osType",
            "properties.creationData",
            "properties.diskState",
            "properties.provisioningState",
        ]))
        .tier(1);

    CatalogEntry::new(
        kind,
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Compute/disks/{name}",
        "2023-04-02",
    )
}
