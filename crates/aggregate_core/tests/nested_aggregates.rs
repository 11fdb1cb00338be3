mod support;

use aggregate_core::{
    open_db_in_memory, properties_of, AggregateTemplate, NoopSink, SqliteDataAccessStrategy,
};
use rusqlite::Connection;
use support::{
    line, node, order, row_count, LegoSet, LineNote, Node, OrderLine, PurchaseOrder, SCHEMA,
};

fn template(conn: &Connection) -> AggregateTemplate<SqliteDataAccessStrategy<'_>, NoopSink> {
    AggregateTemplate::new(SqliteDataAccessStrategy::new(conn), NoopSink)
}

fn sample_order() -> PurchaseOrder {
    order(
        "rebel alliance",
        vec![
            line("x-wing", 12, &["red squadron", "gold squadron"]),
            line("y-wing", 4, &[]),
            line("b-wing", 2, &["prototype"]),
        ],
    )
}

#[test]
fn nested_aggregate_round_trips_with_collection_order() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let template = template(&conn);
    let mut purchase = sample_order();

    let id = template.save(&mut purchase).unwrap();

    assert!(purchase.lines.iter().all(|line| line.id.is_some()));
    assert!(purchase
        .lines
        .iter()
        .flat_map(|line| &line.notes)
        .all(|note| note.id.is_some()));

    let reloaded = template.find_by_id::<PurchaseOrder>(id).unwrap().unwrap();
    assert_eq!(reloaded, purchase);
    assert_eq!(row_count(&conn, "order_line"), 3);
    assert_eq!(row_count(&conn, "line_note"), 3);
}

#[test]
fn reordering_a_collection_is_persisted_through_key_column() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let template = template(&conn);
    let mut purchase = sample_order();
    let id = template.save(&mut purchase).unwrap();

    purchase.lines.reverse();
    template.save(&mut purchase).unwrap();

    let reloaded = template.find_by_id::<PurchaseOrder>(id).unwrap().unwrap();
    let products: Vec<&str> = reloaded
        .lines
        .iter()
        .map(|line| line.product.as_str())
        .collect();
    assert_eq!(products, vec!["b-wing", "y-wing", "x-wing"]);

    let positions: Vec<i64> = conn
        .prepare("SELECT position FROM order_line ORDER BY position")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(positions, vec![0, 1, 2]);
}

#[test]
fn resaving_replaces_grandchildren_without_orphans() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let template = template(&conn);
    let mut purchase = sample_order();
    let id = template.save(&mut purchase).unwrap();

    purchase.lines.truncate(1);
    purchase.lines[0].notes = vec![LineNote {
        id: None,
        text: "only note".to_string(),
    }];
    template.save(&mut purchase).unwrap();

    assert_eq!(row_count(&conn, "order_line"), 1);
    assert_eq!(row_count(&conn, "line_note"), 1);
    let reloaded = template.find_by_id::<PurchaseOrder>(id).unwrap().unwrap();
    assert_eq!(reloaded.lines[0].notes[0].text, "only note");
}

#[test]
fn emptying_a_collection_removes_all_child_rows() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let template = template(&conn);
    let mut purchase = sample_order();
    let id = template.save(&mut purchase).unwrap();

    purchase.lines.clear();
    template.save(&mut purchase).unwrap();

    let reloaded = template.find_by_id::<PurchaseOrder>(id).unwrap().unwrap();
    assert!(reloaded.lines.is_empty());
    assert_eq!(row_count(&conn, "order_line"), 0);
    assert_eq!(row_count(&conn, "line_note"), 0);
}

#[test]
fn delete_cascades_through_every_level() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let template = template(&conn);
    let mut doomed = sample_order();
    let mut kept = order("empire", vec![line("tie fighter", 100, &["mass produced"])]);
    template.save(&mut doomed).unwrap();
    template.save(&mut kept).unwrap();

    template.delete(&doomed).unwrap();

    assert_eq!(template.find_all::<PurchaseOrder>().unwrap(), vec![kept]);
    assert_eq!(template.find_all::<OrderLine>().unwrap().len(), 1);
    assert_eq!(template.find_all::<LineNote>().unwrap().len(), 1);
}

#[test]
fn delete_all_clears_deepest_tables_first() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let template = template(&conn);
    template.save(&mut sample_order()).unwrap();
    template
        .save(&mut order("empire", vec![line("tie fighter", 100, &["mass produced"])]))
        .unwrap();

    template.delete_all::<PurchaseOrder>().unwrap();

    assert_eq!(row_count(&conn, "purchase_order"), 0);
    assert_eq!(row_count(&conn, "order_line"), 0);
    assert_eq!(row_count(&conn, "line_note"), 0);
}

fn sample_tree() -> Node {
    node(
        "root",
        vec![
            node("left", vec![node("left.leaf", vec![])]),
            node("right", vec![]),
        ],
    )
}

#[test]
fn self_referential_aggregate_round_trips_and_deletes() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let template = template(&conn);
    let mut tree = sample_tree();

    let id = template.save(&mut tree).unwrap();
    assert_eq!(template.find_by_id::<Node>(id).unwrap().unwrap(), tree);
    assert_eq!(row_count(&conn, "node"), 4);

    template.delete(&tree).unwrap();
    assert_eq!(row_count(&conn, "node"), 0);
}

#[test]
fn delete_all_terminates_on_self_referential_aggregate() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let template = template(&conn);
    template.save(&mut sample_tree()).unwrap();
    template.save(&mut node("single", vec![])).unwrap();

    template.delete_all::<Node>().unwrap();

    assert_eq!(row_count(&conn, "node"), 0);
    assert_eq!(template.count::<Node>().unwrap(), 0);
}

#[test]
fn properties_describe_identifier_columns_and_relations() {
    let order_properties = properties_of::<PurchaseOrder>();
    assert_eq!(order_properties.len(), 3);
    assert!(order_properties[0].is_identifier);
    assert_eq!(order_properties[0].column, "id");
    assert_eq!(order_properties[1].name, "customer");
    assert!(!order_properties[1].is_reference());

    let lines = &order_properties[2];
    assert_eq!(lines.name, "lines");
    assert_eq!(lines.column, "purchase_order");
    assert!(lines.is_collection);
    assert_eq!(lines.referenced_type, Some(std::any::type_name::<OrderLine>()));

    let set_properties = properties_of::<LegoSet>();
    let manual = set_properties
        .iter()
        .find(|property| property.name == "manual")
        .unwrap();
    assert!(manual.is_reference());
    assert!(!manual.is_collection);
    assert_eq!(
        set_properties
            .iter()
            .filter(|property| property.is_identifier)
            .count(),
        1
    );
}
