//! `postgresql_server`: single-server PostgreSQL
//!
//! The administrator password is write-only: it is sent on every upsert
//! that happens anyway, never compared, and redacted from results.

use super::{CatalogEntry, paths, scoped_kind};
use reconcile::{ArgSpec, Compare, ParamSpec, RequiredIf};

pub(crate) fn entry() -> CatalogEntry {
    let args = ArgSpec::new()
        .param("sku_name", ParamSpec::str().describe("e.g. GP_Gen5_2"))
        .param(
            "sku_tier",
            ParamSpec::str()
                .choices(["Basic", "GeneralPurpose", "MemoryOptimized"])
                .ignore_case(),
        )
        .param(
            "version",
            ParamSpec::str().choices(["9.5", "9.6", "10", "11"]),
        )
        .param("storage_mb", ParamSpec::int())
        .param("backup_retention_days", ParamSpec::int())
        .param(
            "geo_redundant_backup",
            ParamSpec::str().choices(["Enabled", "Disabled"]).ignore_case(),
        )
        .param(
            "ssl_enforcement",
            ParamSpec::str().choices(["Enabled", "Disabled"]).ignore_case(),
        )
        .param("admin_username", ParamSpec::str())
        .param("admin_password", ParamSpec::str().no_log())
        .param(
            "create_mode",
            ParamSpec::str()
                .choices(["Default", "PointInTimeRestore", "GeoRestore", "Replica"])
                .ignore_case(),
        )
        .param("source_server_id", ParamSpec::str())
        .param(
            "restore_point_in_time",
            ParamSpec::str().describe("ISO 8601 timestamp to restore to"),
        )
        .required_together(["admin_username", "admin_password"])
        .required_if(RequiredIf::new(
            "create_mode",
            "PointInTimeRestore",
            ["source_server_id", "restore_point_in_time"],
        ))
        .required_if(RequiredIf::new("create_mode", "GeoRestore", ["source_server_id"]))
        .required_if(RequiredIf::new("create_mode", "Replica", ["source_server_id"]));

    let kind = scoped_kind("postgresql_server", args)
        .describe("Azure Database for PostgreSQL server")
        .bind("sku_name", "sku.name")
        .bind("sku_tier", "sku.tier")
        .bind("version", "properties.version")
        .bind("storage_mb", "properties.storageProfile.storageMB")
        .bind("backup_retention_days", "properties.storageProfile.backupRetentionDays")
        .bind("geo_redundant_backup", "properties.storageProfile.geoRedundantBackup")
        .bind("ssl_enforcement", "properties.sslEnforcement")
        .bind("admin_username", "properties.administratorLogin")
        .bind("admin_password", "properties.administratorLoginPassword")
        .bind("create_mode", "properties.createMode")
        .bind("source_server_id", "properties.sourceServerId")
        .bind("restore_point_in_time", "properties.restorePointInTime")
        .rule("sku.tier", Compare::IgnoreCase)
        .rule("properties.sslEnforcement", Compare::IgnoreCase)
        .rule("properties.storageProfile.geoRedundantBackup", Compare::IgnoreCase)
        .rule("properties.administratorLoginPassword", Compare::Ignore)
        .rule("properties.createMode", Compare::Ignore)
        .rule("properties.sourceServerId", Compare::Ignore)
        .rule("properties.restorePointInTime", Compare::Ignore)
        .create_only("properties.version")
        .create_only("properties.administratorLogin")
        .create_only("properties.storageProfile.geoRedundantBackup")
        .returns(paths(&[
            "id",
            "name",
            "location",
            "tags",
            "sku",
            "properties.version",
            "properties.administratorLogin",
            "properties.administratorLoginPassword",
            "properties.storageProfile",
            "properties.sslEnforcement",
            "properties.fullyQualifiedDomainName",
            "properties.userVisibleState",
            "properties.provisioningState",
        ]))
        .tier(1);

    CatalogEntry::new(
        kind,
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.DBforPostgreSQL/servers/{name}",
        "2017-12-01",
    )
}
