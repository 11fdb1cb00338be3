//! Owned child relations.
//!
//! A relation knows how to reach its children on a parent instance and
//! delegates the actual traversal to `engine::cascade`, which recurses into
//! the child type's own relations.

use super::entity::Entity;
use super::{ChildTable, Identifier, MappingError, PropertyDescriptor};
use crate::access::DataAccessStrategy;
use crate::engine::cascade;
use crate::engine::EngineResult;
use std::collections::HashSet;

/// Type-erased view of one owned relation of parent type `P`.
///
/// Implemented by [`OneToOne`] and [`OneToMany`].
pub trait Relation<P>: Send + Sync {
    fn descriptor(&self) -> PropertyDescriptor;
    fn child_table(&self) -> ChildTable;
    /// Removes every child row (and its descendants) owned by `parent_id`.
    fn delete_owned(
        &self,
        access: &dyn DataAccessStrategy,
        parent_id: Identifier,
    ) -> EngineResult<()>;
    /// Removes every row of the child table and of its descendant tables,
    /// skipping tables already in `cleared`.
    fn delete_all_owned(
        &self,
        access: &dyn DataAccessStrategy,
        cleared: &mut HashSet<&'static str>,
    ) -> EngineResult<()>;
    /// Inserts the children currently referenced by `parent`.
    fn insert_owned(
        &self,
        parent: &mut P,
        parent_id: Identifier,
        access: &dyn DataAccessStrategy,
    ) -> EngineResult<()>;
    /// Loads persisted children and attaches them to `parent`.
    fn load_owned(
        &self,
        parent: &mut P,
        parent_id: Identifier,
        access: &dyn DataAccessStrategy,
    ) -> EngineResult<()>;
}

/// Single-valued owned child: `Option<C>` on the parent.
pub struct OneToOne<P, C> {
    property: &'static str,
    back_reference: &'static str,
    slot: fn(&mut P) -> &mut Option<C>,
}

impl<P, C: Entity> OneToOne<P, C> {
    pub fn new(
        property: &'static str,
        back_reference: &'static str,
        slot: fn(&mut P) -> &mut Option<C>,
    ) -> Self {
        Self {
            property,
            back_reference,
            slot,
        }
    }
}

impl<P: 'static, C: Entity> Relation<P> for OneToOne<P, C> {
    fn descriptor(&self) -> PropertyDescriptor {
        PropertyDescriptor {
            name: self.property,
            column: self.back_reference,
            is_identifier: false,
            referenced_type: Some(std::any::type_name::<C>()),
            is_collection: false,
        }
    }

    fn child_table(&self) -> ChildTable {
        ChildTable {
            table: C::entity_type().table(),
            back_reference: self.back_reference,
            key_column: None,
        }
    }

    fn delete_owned(
        &self,
        access: &dyn DataAccessStrategy,
        parent_id: Identifier,
    ) -> EngineResult<()> {
        cascade::delete_owned::<C>(access, self.child_table(), parent_id)
    }

    fn delete_all_owned(
        &self,
        access: &dyn DataAccessStrategy,
        cleared: &mut HashSet<&'static str>,
    ) -> EngineResult<()> {
        cascade::delete_all::<C>(access, cleared)
    }

    fn insert_owned(
        &self,
        parent: &mut P,
        parent_id: Identifier,
        access: &dyn DataAccessStrategy,
    ) -> EngineResult<()> {
        match (self.slot)(parent) {
            Some(child) => {
                cascade::insert_owned(access, self.child_table(), parent_id, None, child)
            }
            None => Ok(()),
        }
    }

    fn load_owned(
        &self,
        parent: &mut P,
        parent_id: Identifier,
        access: &dyn DataAccessStrategy,
    ) -> EngineResult<()> {
        let child_table = self.child_table();
        let mut children = cascade::load_owned::<C>(access, child_table, parent_id)?;
        if children.len() > 1 {
            return Err(MappingError::AmbiguousChild {
                table: child_table.table.name,
                parent_id,
                rows: children.len(),
            }
            .into());
        }
        *(self.slot)(parent) = children.pop();
        Ok(())
    }
}

/// Collection-valued owned children: `Vec<C>` on the parent.
pub struct OneToMany<P, C> {
    property: &'static str,
    back_reference: &'static str,
    key_column: Option<&'static str>,
    slot: fn(&mut P) -> &mut Vec<C>,
}

impl<P, C: Entity> OneToMany<P, C> {
    pub fn new(
        property: &'static str,
        back_reference: &'static str,
        slot: fn(&mut P) -> &mut Vec<C>,
    ) -> Self {
        Self {
            property,
            back_reference,
            key_column: None,
            slot,
        }
    }

    /// Persists each element's position in `column` and reloads in that order.
    pub fn with_key_column(mut self, column: &'static str) -> Self {
        self.key_column = Some(column);
        self
    }
}

impl<P: 'static, C: Entity> Relation<P> for OneToMany<P, C> {
    fn descriptor(&self) -> PropertyDescriptor {
        PropertyDescriptor {
            name: self.property,
            column: self.back_reference,
            is_identifier: false,
            referenced_type: Some(std::any::type_name::<C>()),
            is_collection: true,
        }
    }

    fn child_table(&self) -> ChildTable {
        ChildTable {
            table: C::entity_type().table(),
            back_reference: self.back_reference,
            key_column: self.key_column,
        }
    }

    fn delete_owned(
        &self,
        access: &dyn DataAccessStrategy,
        parent_id: Identifier,
    ) -> EngineResult<()> {
        cascade::delete_owned::<C>(access, self.child_table(), parent_id)
    }

    fn delete_all_owned(
        &self,
        access: &dyn DataAccessStrategy,
        cleared: &mut HashSet<&'static str>,
    ) -> EngineResult<()> {
        cascade::delete_all::<C>(access, cleared)
    }

    fn insert_owned(
        &self,
        parent: &mut P,
        parent_id: Identifier,
        access: &dyn DataAccessStrategy,
    ) -> EngineResult<()> {
        let child_table = self.child_table();
        for (position, child) in (self.slot)(parent).iter_mut().enumerate() {
            cascade::insert_owned(access, child_table, parent_id, Some(position), child)?;
        }
        Ok(())
    }

    fn load_owned(
        &self,
        parent: &mut P,
        parent_id: Identifier,
        access: &dyn DataAccessStrategy,
    ) -> EngineResult<()> {
        *(self.slot)(parent) = cascade::load_owned::<C>(access, self.child_table(), parent_id)?;
        Ok(())
    }
}
