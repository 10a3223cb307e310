//! DDL generation for table descriptions.

use crate::{Column, ForeignKey, Index, IndexColumn, TableDef, TableSet};
use pgdeclare_sql::{Ident, Qualified, join_idents, quote_ident};

/// `CREATE TABLE` for one table, without its foreign keys; those are added
/// by [`add_foreign_key_sql`] once every table of a batch exists.
pub fn create_table_sql(table: &TableDef) -> String {
    let name = Qualified(table.schema.as_deref(), &table.name);
    let keys: Vec<&Column> = table.columns.iter().filter(|c| c.primary_key).collect();
    // more than one key column needs a table constraint
    let composite = keys.len() > 1;

    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|column| column_sql(column, composite))
        .collect();
    if composite {
        let names = join_idents(keys.iter().map(|c| c.name.as_str()));
        lines.push(format!("    PRIMARY KEY ({names})"));
    }

    if lines.is_empty() {
        format!("CREATE TABLE {name} ();")
    } else {
        format!("CREATE TABLE {name} (\n{}\n);", lines.join(",\n"))
    }
}

fn column_sql(column: &Column, composite_key: bool) -> String {
    let inline_key = column.primary_key && !composite_key;
    let mut out = format!("    {} {}", Ident(&column.name), column.pg_type);
    if inline_key {
        out.push_str(" PRIMARY KEY");
    } else if !column.nullable {
        out.push_str(" NOT NULL");
    }
    if column.unique && !column.primary_key {
        out.push_str(" UNIQUE");
    }
    if let Some(expr) = &column.default {
        out.push_str(" DEFAULT ");
        out.push_str(expr);
    }
    out
}

pub fn create_index_sql(table: &TableDef, index: &Index) -> String {
    let columns: Vec<String> = index.columns.iter().map(index_column_to_sql).collect();
    let mut sql = format!(
        "CREATE {}INDEX {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        Ident(&index.name),
        Qualified(table.schema.as_deref(), &table.name),
        columns.join(", "),
    );
    if let Some(predicate) = &index.where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(predicate);
    }
    sql.push(';');
    sql
}

/// `ALTER TABLE .. ADD CONSTRAINT fk_{table}_{columns} ..`. A bare referenced
/// table name resolves in the referencing table's schema.
pub fn add_foreign_key_sql(table: &TableDef, fk: &ForeignKey) -> String {
    let constraint = format!("fk_{}_{}", table.name, fk.columns.join("_"));
    let (ref_schema, ref_table) = match fk.references_table.split_once('.') {
        Some((schema, name)) => (Some(schema), name),
        None => (table.schema.as_deref(), fk.references_table.as_str()),
    };
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({});",
        Qualified(table.schema.as_deref(), &table.name),
        Ident(&constraint),
        join_idents(fk.columns.iter().map(String::as_str)),
        Qualified(ref_schema, ref_table),
        join_idents(fk.references_columns.iter().map(String::as_str)),
    )
}

/// Generate the DROP TABLE statement for a table.
pub fn drop_table_sql(table: &TableDef) -> String {
    format!(
        "DROP TABLE IF EXISTS {};",
        Qualified(table.schema.as_deref(), &table.name)
    )
}

/// e.g. `created_at DESC NULLS LAST`
pub fn index_column_to_sql(column: &IndexColumn) -> String {
    let mut out = quote_ident(&column.name);
    out.push_str(column.order.to_sql());
    out.push_str(column.nulls.to_sql());
    out
}

/// Statements creating `tables`: tables first, then foreign keys, then indices.
///
/// The caller decides which tables to include (e.g. only the missing ones)
/// and in what order.
pub fn create_statements<'a>(tables: impl IntoIterator<Item = &'a TableDef>) -> Vec<String> {
    let tables: Vec<&TableDef> = tables.into_iter().collect();
    let mut statements: Vec<String> = tables.iter().map(|t| create_table_sql(t)).collect();

    for table in &tables {
        for fk in &table.foreign_keys {
            statements.push(add_foreign_key_sql(table, fk));
        }
    }

    for table in &tables {
        for idx in &table.indices {
            statements.push(create_index_sql(table, idx));
        }
    }

    statements
}

/// Statements dropping `tables`, in the order given.
pub fn drop_statements<'a>(tables: impl IntoIterator<Item = &'a TableDef>) -> Vec<String> {
    tables.into_iter().map(drop_table_sql).collect()
}

/// Generate a complete script creating every table of the set.
pub fn table_set_to_sql(set: &TableSet) -> String {
    create_statements(set.dependency_order()).join("\n\n")
}
