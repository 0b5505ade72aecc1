//! Typed component queries and component bundles.
//!
//! A [`Query`] names a set of component types as a tuple, e.g.
//! `(Position, Speed)`. Fetching a query from an [`Entity`] yields one
//! [`ComponentHandle`] per type, or `None` if any of them is missing.
//!
//! A [`Bundle`] is a tuple of component values attached in one go when an
//! entity is created.

use crate::component::{Component, ComponentHandle, ComponentTypeId};
use crate::entity::Entity;

/// A set of component types that must all be present on an entity.
pub trait Query {
    /// The handles produced for a matching entity.
    type Item;

    /// Wire tags of every component type in the query.
    fn type_ids() -> Vec<ComponentTypeId>;

    /// Returns `true` if `entity` has every component in the query.
    fn matches(entity: &Entity) -> bool {
        Self::type_ids().into_iter().all(|id| entity.has_type(id))
    }

    /// Fetch handles for every component, or `None` if one is missing.
    fn fetch(entity: &Entity) -> Option<Self::Item>;
}

/// A group of components attached together.
pub trait Bundle {
    /// Attach every component in the bundle to `entity`.
    fn insert_into(self, entity: &mut Entity);
}

macro_rules! impl_query {
    ($($name:ident),+) => {
        impl<$($name: Component),+> Query for ($($name,)+) {
            type Item = ($(ComponentHandle<$name>,)+);

            fn type_ids() -> Vec<ComponentTypeId> {
                vec![$($name::component_type_id()),+]
            }

            fn fetch(entity: &Entity) -> Option<Self::Item> {
                Some(($(entity.get::<$name>()?,)+))
            }
        }
    };
}

impl_query!(A);
impl_query!(A, B);
impl_query!(A, B, C);
impl_query!(A, B, C, D);

macro_rules! impl_bundle {
    ($($name:ident),+) => {
        impl<$($name: Component),+> Bundle for ($($name,)+) {
            #[allow(non_snake_case)]
            fn insert_into(self, entity: &mut Entity) {
                let ($($name,)+) = self;
                $(entity.add($name);)+
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);

impl Bundle for () {
    fn insert_into(self, _entity: &mut Entity) {}
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::entity::EntityId;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Position {
        x: i32,
        y: i32,
    }

    impl Component for Position {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Speed(f32);

    impl Component for Speed {
        fn type_name() -> &'static str {
            "Speed"
        }
    }

    #[test]
    fn test_fetch_requires_every_component() {
        let mut entity = Entity::new(EntityId(1));
        (Position { x: 1, y: 2 },).insert_into(&mut entity);

        assert!(<(Position,)>::matches(&entity));
        assert!(!<(Position, Speed)>::matches(&entity));
        assert!(<(Position, Speed)>::fetch(&entity).is_none());

        entity.add(Speed(2.5));
        let (pos, speed) = <(Position, Speed)>::fetch(&entity).unwrap();
        assert_eq!(pos.get().x, 1);
        assert_eq!(speed.get().0, 2.5);
    }

    #[test]
    fn test_bundle_inserts_all() {
        let mut entity = Entity::new(EntityId(1));
        (Position { x: 0, y: 0 }, Speed(1.0)).insert_into(&mut entity);
        assert_eq!(entity.len(), 2);
        assert_eq!(
            <(Position, Speed)>::type_ids(),
            vec![Position::component_type_id(), Speed::component_type_id()]
        );
    }
}
