use super::ddl::*;
use super::*;

fn tenant() -> TableDef {
    TableDef::new("tenant")
        .column(Column::new("id", PgType::BigSerial).primary_key())
        .column(Column::new("name", PgType::Text).unique())
}

fn user() -> TableDef {
    TableDef::new("user")
        .column(Column::new("id", PgType::BigSerial).primary_key())
        .column(Column::new("email", PgType::Varchar(255)).unique())
        .column(Column::new("bio", PgType::Text).nullable())
        .column(Column::new("created_at", PgType::Timestamptz).default("now()"))
        .column(Column::new("tenant_id", PgType::BigInt))
        .foreign_key(ForeignKey::parse("tenant_id", "tenant.id").unwrap())
        .index(Index::on("user", &["created_at DESC"]))
}

#[test]
fn test_parse_fk_reference() {
    assert_eq!(parse_fk_reference("users.id"), Some(("users", "id")));
    assert_eq!(parse_fk_reference("log.users.id"), Some(("log.users", "id")));
    assert_eq!(parse_fk_reference("shop(id)"), Some(("shop", "id")));
    assert_eq!(parse_fk_reference(""), None);
    assert_eq!(parse_fk_reference("users"), None);
    assert_eq!(parse_fk_reference(".id"), None);
    assert_eq!(parse_fk_reference("users."), None);
    assert_eq!(parse_fk_reference("(id)"), None);
    assert_eq!(parse_fk_reference("users()"), None);
}

#[test]
fn test_parse_fk_reference_unbalanced_parens() {
    assert_eq!(parse_fk_reference("a)(b"), None);
    assert_eq!(parse_fk_reference("a(b"), None);
    assert_eq!(parse_fk_reference("a(b))"), None);
    assert_eq!(parse_fk_reference("a("), None);
    assert_eq!(parse_fk_reference("a(b)c"), None);
    assert!(ForeignKey::parse("tenant_id", "tenant)(id").is_none());
}

#[test]
fn test_index_column_parse() {
    let col = IndexColumn::parse("created_at DESC NULLS LAST");
    assert_eq!(col.name, "created_at");
    assert_eq!(col.order, SortOrder::Desc);
    assert_eq!(col.nulls, NullsOrder::Last);

    let col = IndexColumn::parse("\"Name\" ASC");
    assert_eq!(col.name, "Name");
    assert_eq!(col.order, SortOrder::Asc);
    assert_eq!(col.nulls, NullsOrder::Default);
}

#[test]
fn test_table_keys() {
    let set = TableSet::new()
        .with(TableDef::new("article"))
        .with(TableDef::new("bad_request").in_schema("log"));
    assert_eq!(set.len(), 2);
    assert!(set.get("article").is_some());
    assert!(set.get("log.bad_request").is_some());
    assert!(set.get("bad_request").is_none());
    assert_eq!(set.get("article").unwrap().schema_name(), "public");
    assert_eq!(set.get("log.bad_request").unwrap().schema_name(), "log");
}

#[test]
fn test_dependency_order() {
    // Declared child-first on purpose.
    let set = TableSet::new().with(user()).with(tenant());
    let names: Vec<&str> = set.dependency_order().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["tenant", "user"]);
}

#[test]
fn test_dependency_order_cycle_keeps_declaration_order() {
    let a = TableDef::new("a")
        .column(Column::new("b_id", PgType::BigInt))
        .foreign_key(ForeignKey::parse("b_id", "b.id").unwrap());
    let b = TableDef::new("b")
        .column(Column::new("a_id", PgType::BigInt))
        .foreign_key(ForeignKey::parse("a_id", "a.id").unwrap());
    let c = TableDef::new("c");
    let set = TableSet::new().with(a).with(b).with(c);
    let names: Vec<&str> = set.dependency_order().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["c", "a", "b"]);
}

#[test]
fn test_dependency_order_respects_schemas() {
    let public_parent = TableDef::new("parent");
    let log_parent = TableDef::new("parent").in_schema("log");
    let child = TableDef::new("child")
        .in_schema("log")
        .foreign_key(ForeignKey::parse("parent_id", "parent.id").unwrap());
    let set = TableSet::new()
        .with(child)
        .with(public_parent)
        .with(log_parent);
    let keys: Vec<String> = set.dependency_order().iter().map(|t| t.key()).collect();
    assert_eq!(keys, ["parent", "log.parent", "log.child"]);
}

#[test]
fn test_create_table_sql() {
    insta::assert_snapshot!(create_table_sql(&user()), @r#"
    CREATE TABLE "user" (
        id BIGSERIAL PRIMARY KEY,
        email VARCHAR(255) NOT NULL UNIQUE,
        bio TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        tenant_id BIGINT NOT NULL
    );
    "#);
}

#[test]
fn test_create_table_sql_composite_key_in_schema() {
    let table = TableDef::new("post_tag")
        .in_schema("blog")
        .column(Column::new("post_id", PgType::BigInt).primary_key())
        .column(Column::new("tag_id", PgType::BigInt).primary_key());
    insta::assert_snapshot!(create_table_sql(&table), @r"
    CREATE TABLE blog.post_tag (
        post_id BIGINT NOT NULL,
        tag_id BIGINT NOT NULL,
        PRIMARY KEY (post_id, tag_id)
    );
    ");
}

#[test]
fn test_create_table_sql_without_columns() {
    let table = TableDef::new("keyword");
    assert_eq!(create_table_sql(&table), "CREATE TABLE keyword ();");
}

#[test]
fn test_create_index_sql() {
    let table = user();
    assert_eq!(
        create_index_sql(&table, &table.indices[0]),
        "CREATE INDEX idx_user_created_at ON \"user\" (created_at DESC);"
    );

    let unique = Index::on("user", &["email"]).unique().filter("bio IS NULL");
    assert_eq!(
        create_index_sql(&table, &unique),
        "CREATE UNIQUE INDEX uq_user_email ON \"user\" (email) WHERE bio IS NULL;"
    );
}

#[test]
fn test_add_foreign_key_sql() {
    let table = user();
    assert_eq!(
        add_foreign_key_sql(&table, &table.foreign_keys[0]),
        "ALTER TABLE \"user\" ADD CONSTRAINT fk_user_tenant_id FOREIGN KEY (tenant_id) REFERENCES tenant(id);"
    );

    let child = TableDef::new("request")
        .in_schema("log")
        .foreign_key(ForeignKey::parse("tenant_id", "public.tenant.id").unwrap());
    assert_eq!(
        add_foreign_key_sql(&child, &child.foreign_keys[0]),
        "ALTER TABLE log.request ADD CONSTRAINT fk_request_tenant_id FOREIGN KEY (tenant_id) REFERENCES public.tenant(id);"
    );
}

#[test]
fn test_create_statements_order() {
    let set = TableSet::new().with(user()).with(tenant());
    let statements = create_statements(set.dependency_order());
    assert_eq!(statements.len(), 4);
    assert!(statements[0].starts_with("CREATE TABLE tenant"));
    assert!(statements[1].starts_with("CREATE TABLE \"user\""));
    assert!(statements[2].starts_with("ALTER TABLE \"user\""));
    assert!(statements[3].starts_with("CREATE INDEX"));
}

#[test]
fn test_drop_statements() {
    let set = TableSet::new()
        .with(tenant())
        .with(TableDef::new("good_request").in_schema("log"));
    assert_eq!(
        drop_statements(set.iter()),
        [
            "DROP TABLE IF EXISTS tenant;",
            "DROP TABLE IF EXISTS log.good_request;"
        ]
    );
}
