//! Entity trait and per-type descriptor tables.

use super::relation::Relation;
use super::{Identifier, MappingResult, PropertyDescriptor, Record, Table};

/// A type the engine can persist as an aggregate root or an owned child.
///
/// Implementations map plain properties only. The engine writes the
/// identifier column, back-reference columns and collection keys itself.
///
/// # Example
///
/// ```
/// use aggregate_core::mapping::{Entity, EntityType, Identifier, MappingResult, Record};
/// use once_cell::sync::Lazy;
///
/// struct Manual {
///     id: Option<Identifier>,
///     content: String,
/// }
///
/// impl Entity for Manual {
///     fn entity_type() -> &'static EntityType<Self> {
///         static TYPE: Lazy<EntityType<Manual>> =
///             Lazy::new(|| EntityType::builder("manual", "id").column("content").build());
///         &TYPE
///     }
///
///     fn id(&self) -> Option<Identifier> {
///         self.id
///     }
///
///     fn set_id(&mut self, id: Identifier) {
///         self.id = Some(id);
///     }
///
///     fn write_columns(&self, record: &mut Record) {
///         record.set("content", self.content.clone());
///     }
///
///     fn read_columns(record: &Record) -> MappingResult<Self> {
///         Ok(Self {
///             id: Some(record.identifier("id")?),
///             content: record.get("content")?,
///         })
///     }
/// }
///
/// assert_eq!(Manual::entity_type().table().name, "manual");
/// ```
pub trait Entity: Sized + 'static {
    /// Descriptor table, built once per type.
    fn entity_type() -> &'static EntityType<Self>;
    fn id(&self) -> Option<Identifier>;
    fn set_id(&mut self, id: Identifier);
    /// Writes plain (non-identifier, non-reference) columns.
    fn write_columns(&self, record: &mut Record);
    /// Builds an instance from one row, without owned children.
    fn read_columns(record: &Record) -> MappingResult<Self>;
}

/// Mapping metadata for one entity type.
pub struct EntityType<E> {
    name: &'static str,
    table: Table,
    properties: Vec<PropertyDescriptor>,
    relations: Vec<Box<dyn Relation<E>>>,
}

impl<E: Entity> EntityType<E> {
    /// Starts a descriptor for `table` whose identifier lives in `id_column`.
    pub fn builder(table: &'static str, id_column: &'static str) -> EntityTypeBuilder<E> {
        EntityTypeBuilder {
            table: Table::new(table, id_column),
            properties: vec![PropertyDescriptor {
                name: id_column,
                column: id_column,
                is_identifier: true,
                referenced_type: None,
                is_collection: false,
            }],
            relations: Vec::new(),
        }
    }
}

impl<E> EntityType<E> {
    /// Rust type name of the mapped entity.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn identifier_property(&self) -> &PropertyDescriptor {
        &self.properties[0]
    }

    pub fn relations(&self) -> &[Box<dyn Relation<E>>] {
        &self.relations
    }

    pub fn has_relations(&self) -> bool {
        !self.relations.is_empty()
    }
}

/// Builder returned by [`EntityType::builder`].
pub struct EntityTypeBuilder<E> {
    table: Table,
    properties: Vec<PropertyDescriptor>,
    relations: Vec<Box<dyn Relation<E>>>,
}

impl<E: Entity> EntityTypeBuilder<E> {
    /// Declares one plain column mapped to a property of the same name.
    pub fn column(mut self, name: &'static str) -> Self {
        self.properties.push(PropertyDescriptor {
            name,
            column: name,
            is_identifier: false,
            referenced_type: None,
            is_collection: false,
        });
        self
    }

    /// Declares one owned child relation.
    pub fn relation(mut self, relation: impl Relation<E> + 'static) -> Self {
        self.properties.push(relation.descriptor());
        self.relations.push(Box::new(relation));
        self
    }

    pub fn build(self) -> EntityType<E> {
        EntityType {
            name: std::any::type_name::<E>(),
            table: self.table,
            properties: self.properties,
            relations: self.relations,
        }
    }
}

/// Persistent properties of `E`, identifier first.
pub fn properties_of<E: Entity>() -> &'static [PropertyDescriptor] {
    E::entity_type().properties()
}
