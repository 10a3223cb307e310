//! Reconciliation against a real PostgreSQL.
//!
//! Run with: cargo test -p pgdeclare --features test-postgres --test postgres
//!
//! Note: Requires Docker to be running.

#![cfg(feature = "test-postgres")]

use pgdeclare::tables::{Column, PgType, TableDef, TableSet};
use pgdeclare::{
    ConnectionConfig, Controller, Database, DatabaseContent, GrantOn, GrantTo, Privilege,
    Registry, Role, Schema, Session,
};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;

async fn start() -> (ContainerAsync<Postgres>, Session) {
    let container = Postgres::default()
        .with_tag("16-alpine")
        .start()
        .await
        .expect("failed to start postgres container");
    let host = container.get_host().await.expect("container host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("container port");
    let cluster = ConnectionConfig::new(host.to_string(), port, "postgres").password("postgres");
    (container, Session::postgres(cluster))
}

#[tokio::test]
async fn run_all_then_remove_all() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let (_container, session) = start().await;

    let mut registry = Registry::new();
    let dev = registry
        .add_database(Database::new("dev").connection_limit(10))
        .unwrap();
    let reader = registry
        .add_role(Role::new("dev_reader").grants([GrantOn::new([Privilege::Connect], [dev])]))
        .unwrap();
    let writer = registry
        .add_role(Role::new("dev_writer").in_role([reader]))
        .unwrap();
    let log = registry.add_schema(Schema::new("log", dev)).unwrap();
    let content = registry
        .add_content(DatabaseContent::new(
            "dev_content",
            dev,
            TableSet::new()
                .with(
                    TableDef::new("article")
                        .column(Column::new("id", PgType::BigSerial).primary_key())
                        .column(Column::new("title", PgType::Text)),
                )
                .with(
                    TableDef::new("bad_request")
                        .in_schema("log")
                        .column(Column::new("id", PgType::BigSerial).primary_key()),
                ),
        ))
        .unwrap();
    registry
        .add_role(Role::new("dev_user").login(true).password("dev").in_role([writer]))
        .unwrap();

    let article = registry.table(content, "article").unwrap();
    let bad_request = registry.table(content, "log.bad_request").unwrap();
    registry
        .grant(log, &[GrantTo::new([Privilege::Usage], [writer])])
        .unwrap();
    registry
        .grant(article, &[GrantTo::new([Privilege::AllPrivileges], [writer])])
        .unwrap();
    registry
        .grant(bad_request, &[GrantTo::new([Privilege::Select, Privilege::Insert], [writer])])
        .unwrap();

    let controller = Controller::new(&registry, &session);
    assert!(!controller.all_entities_exist().await.unwrap());

    controller.run_all().await.unwrap();
    assert!(controller.all_exist().await.unwrap());

    // idempotent
    controller.run_all().await.unwrap();

    controller.revoke_all().await.unwrap();
    assert!(!controller.all_grants_exist().await.unwrap());
    assert!(controller.all_entities_exist().await.unwrap());

    controller.remove_all().await.unwrap();
    assert!(!controller.all_entities_exist().await.unwrap());
}

#[tokio::test]
async fn template_database_can_be_dropped() {
    let (_container, session) = start().await;
    let mut registry = Registry::new();
    registry
        .add_database(Database::new("tmpl").is_template(true))
        .unwrap();

    let controller = Controller::new(&registry, &session);
    controller.run_all().await.unwrap();
    assert!(controller.all_entities_exist().await.unwrap());
    controller.remove_all().await.unwrap();
    assert!(!controller.all_entities_exist().await.unwrap());
}
