//! Entity fixtures and schema shared by the integration tests.

#![allow(dead_code)]

use aggregate_core::{
    Entity, EntityType, Identifier, MappingResult, Migration, OneToMany, OneToOne, Record,
};
use once_cell::sync::Lazy;
use rusqlite::Connection;

pub const SCHEMA: &[Migration] = &[
    Migration::new(
        1,
        "CREATE TABLE lego_set (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        );
        CREATE TABLE manual (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT,
            lego_set INTEGER REFERENCES lego_set(id)
        );",
    ),
    Migration::new(
        2,
        "CREATE TABLE purchase_order (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer TEXT NOT NULL
        );
        CREATE TABLE order_line (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            purchase_order INTEGER NOT NULL REFERENCES purchase_order(id),
            position INTEGER NOT NULL,
            product TEXT NOT NULL,
            quantity INTEGER NOT NULL
        );
        CREATE TABLE line_note (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_line INTEGER NOT NULL REFERENCES order_line(id),
            text TEXT NOT NULL
        );",
    ),
    Migration::new(
        3,
        "CREATE TABLE node (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            parent INTEGER REFERENCES node(id),
            label TEXT NOT NULL
        );",
    ),
];

pub const STAR_DESTROYER_MANUAL: &str =
    "Accelerates to 99% of light speed. Destroys almost everything. See https://what-if.xkcd.com/1/";

#[derive(Debug, Clone, PartialEq)]
pub struct LegoSet {
    pub id: Option<Identifier>,
    pub name: String,
    pub manual: Option<Manual>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manual {
    pub id: Option<Identifier>,
    pub content: String,
}

impl Manual {
    pub fn new(id: Option<Identifier>, content: &str) -> Self {
        Self {
            id,
            content: content.to_string(),
        }
    }
}

impl Entity for LegoSet {
    fn entity_type() -> &'static EntityType<Self> {
        static TYPE: Lazy<EntityType<LegoSet>> = Lazy::new(|| {
            EntityType::builder("lego_set", "id")
                .column("name")
                .relation(OneToOne::new("manual", "lego_set", |set: &mut LegoSet| {
                    &mut set.manual
                }))
                .build()
        });
        &TYPE
    }

    fn id(&self) -> Option<Identifier> {
        self.id
    }

    fn set_id(&mut self, id: Identifier) {
        self.id = Some(id);
    }

    fn write_columns(&self, record: &mut Record) {
        record.set("name", self.name.clone());
    }

    fn read_columns(record: &Record) -> MappingResult<Self> {
        Ok(Self {
            id: None,
            name: record.get("name")?,
            manual: None,
        })
    }
}

impl Entity for Manual {
    fn entity_type() -> &'static EntityType<Self> {
        static TYPE: Lazy<EntityType<Manual>> =
            Lazy::new(|| EntityType::builder("manual", "id").column("content").build());
        &TYPE
    }

    fn id(&self) -> Option<Identifier> {
        self.id
    }

    fn set_id(&mut self, id: Identifier) {
        self.id = Some(id);
    }

    fn write_columns(&self, record: &mut Record) {
        record.set("content", self.content.clone());
    }

    fn read_columns(record: &Record) -> MappingResult<Self> {
        Ok(Self {
            id: None,
            content: record.get("content")?,
        })
    }
}

pub fn star_destroyer() -> LegoSet {
    LegoSet {
        id: None,
        name: "Star Destroyer".to_string(),
        manual: Some(Manual::new(None, STAR_DESTROYER_MANUAL)),
    }
}

/// Three-level aggregate: order -> ordered lines -> notes per line.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseOrder {
    pub id: Option<Identifier>,
    pub customer: String,
    pub lines: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub id: Option<Identifier>,
    pub product: String,
    pub quantity: i64,
    pub notes: Vec<LineNote>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineNote {
    pub id: Option<Identifier>,
    pub text: String,
}

impl Entity for PurchaseOrder {
    fn entity_type() -> &'static EntityType<Self> {
        static TYPE: Lazy<EntityType<PurchaseOrder>> = Lazy::new(|| {
            EntityType::builder("purchase_order", "id")
                .column("customer")
                .relation(
                    OneToMany::new("lines", "purchase_order", |order: &mut PurchaseOrder| {
                        &mut order.lines
                    })
                    .with_key_column("position"),
                )
                .build()
        });
        &TYPE
    }

    fn id(&self) -> Option<Identifier> {
        self.id
    }

    fn set_id(&mut self, id: Identifier) {
        self.id = Some(id);
    }

    fn write_columns(&self, record: &mut Record) {
        record.set("customer", self.customer.clone());
    }

    fn read_columns(record: &Record) -> MappingResult<Self> {
        Ok(Self {
            id: None,
            customer: record.get("customer")?,
            lines: Vec::new(),
        })
    }
}

impl Entity for OrderLine {
    fn entity_type() -> &'static EntityType<Self> {
        static TYPE: Lazy<EntityType<OrderLine>> = Lazy::new(|| {
            EntityType::builder("order_line", "id")
                .column("product")
                .column("quantity")
                .relation(OneToMany::new("notes", "order_line", |line: &mut OrderLine| {
                    &mut line.notes
                }))
                .build()
        });
        &TYPE
    }

    fn id(&self) -> Option<Identifier> {
        self.id
    }

    fn set_id(&mut self, id: Identifier) {
        self.id = Some(id);
    }

    fn write_columns(&self, record: &mut Record) {
        record.set("product", self.product.clone());
        record.set("quantity", self.quantity);
    }

    fn read_columns(record: &Record) -> MappingResult<Self> {
        Ok(Self {
            id: None,
            product: record.get("product")?,
            quantity: record.get("quantity")?,
            notes: Vec::new(),
        })
    }
}

impl Entity for LineNote {
    fn entity_type() -> &'static EntityType<Self> {
        static TYPE: Lazy<EntityType<LineNote>> =
            Lazy::new(|| EntityType::builder("line_note", "id").column("text").build());
        &TYPE
    }

    fn id(&self) -> Option<Identifier> {
        self.id
    }

    fn set_id(&mut self, id: Identifier) {
        self.id = Some(id);
    }

    fn write_columns(&self, record: &mut Record) {
        record.set("text", self.text.clone());
    }

    fn read_columns(record: &Record) -> MappingResult<Self> {
        Ok(Self {
            id: None,
            text: record.get("text")?,
        })
    }
}

pub fn line(product: &str, quantity: i64, notes: &[&str]) -> OrderLine {
    OrderLine {
        id: None,
        product: product.to_string(),
        quantity,
        notes: notes
            .iter()
            .map(|text| LineNote {
                id: None,
                text: text.to_string(),
            })
            .collect(),
    }
}

pub fn order(customer: &str, lines: Vec<OrderLine>) -> PurchaseOrder {
    PurchaseOrder {
        id: None,
        customer: customer.to_string(),
        lines,
    }
}

/// Tree whose children are nodes of the same type.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: Option<Identifier>,
    pub label: String,
    pub children: Vec<Node>,
}

impl Entity for Node {
    fn entity_type() -> &'static EntityType<Self> {
        static TYPE: Lazy<EntityType<Node>> = Lazy::new(|| {
            EntityType::builder("node", "id")
                .column("label")
                .relation(OneToMany::new("children", "parent", |node: &mut Node| {
                    &mut node.children
                }))
                .build()
        });
        &TYPE
    }

    fn id(&self) -> Option<Identifier> {
        self.id
    }

    fn set_id(&mut self, id: Identifier) {
        self.id = Some(id);
    }

    fn write_columns(&self, record: &mut Record) {
        record.set("label", self.label.clone());
    }

    fn read_columns(record: &Record) -> MappingResult<Self> {
        Ok(Self {
            id: None,
            label: record.get("label")?,
            children: Vec::new(),
        })
    }
}

pub fn node(label: &str, children: Vec<Node>) -> Node {
    Node {
        id: None,
        label: label.to_string(),
        children,
    }
}

pub fn row_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}
