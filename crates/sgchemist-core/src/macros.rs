// entity
/// Declare an entity type.
///
/// ```ignore
/// entity! {
///     pub struct Shot = "Shot" {
///         code: Text in_relation "name",
///         status: Status = "sg_status_list",
///         entity: Entity["Asset", "Sequence"],
///         asset: Entity["Asset"] alias entity,
///         tasks: MultiEntity["Task"],
///     }
/// }
/// ```
///
/// Each field is `attr: Kind`, optionally followed by relation targets in
/// brackets, `= "remote_name"`, `in_relation "key"` and `alias other_attr`,
/// in that order. The primary `id` field is implicit.
///
/// Generates the struct (a handle over a `Record`), its `EntityKind` impl,
/// one typed descriptor constant per field (`Shot::CODE`) and instance
/// accessors (`code()`, `set_code(..)`, `with_code(..)`). Aliases are
/// read-only and get no setters.
#[macro_export]
macro_rules! entity {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident = $entity_type:literal {
            $(
                $(#[$fmeta:meta])*
                $attr:ident : $kind:ident
                    $([ $($target:literal),* $(,)? ])?
                    $(= $remote:literal)?
                    $(in_relation $rel:literal)?
                    $(alias $aliased:ident)?
            ),* $(,)?
        }
    ) => {
        $crate::__reexports::paste::paste! {
            $(#[$meta])*
            #[derive(Clone, Debug)]
            $vis struct $name($crate::db::record::Record);

            #[doc(hidden)]
            #[allow(non_camel_case_types, dead_code)]
            enum [<__ $name Slot>] {
                id,
                $($attr,)*
            }

            impl $crate::traits::EntityKind for $name {
                const MODEL: &'static $crate::model::entity::EntityModel =
                    &$crate::model::entity::EntityModel {
                        entity_type: $entity_type,
                        fields: &[
                            $crate::model::field::FieldModel::PRIMARY_ID,
                            $(
                                $crate::entity!(@field $attr $kind
                                    $([ $($target),* ])?
                                    $(= $remote)?
                                    $(in_relation $rel)?
                                    $(alias $aliased)?
                                ),
                            )*
                        ],
                    };

                fn from_record(record: $crate::db::record::Record) -> Self {
                    Self(record)
                }

                fn record(&self) -> &$crate::db::record::Record {
                    &self.0
                }
            }

            impl $crate::traits::AsRecord for $name {
                fn as_record(&self) -> &$crate::db::record::Record {
                    &self.0
                }
            }

            impl $name {
                $(
                    pub const [<$attr:upper>]:
                        $crate::db::query::Field<Self, $crate::fields::$kind> =
                        $crate::db::query::Field::new(
                            <Self as $crate::traits::EntityKind>::MODEL,
                            &<Self as $crate::traits::EntityKind>::MODEL.fields
                                [[<__ $name Slot>]::$attr as usize],
                        );
                )*

                /// Fresh, unsaved instance with default field values.
                #[must_use]
                pub fn new() -> Self {
                    <Self as $crate::traits::EntityKind>::create()
                }

                $(
                    $crate::entity!(@accessors [$(#[$fmeta])*] $attr $kind $(alias $aliased)?);
                )*
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }
        }
    };

    // field models

    (@field $attr:ident $kind:ident [ $($target:literal),* ]
        $(= $remote:literal)? $(in_relation $rel:literal)? $(alias $aliased:ident)?
    ) => {
        $crate::model::field::FieldModel::relation(
            stringify!($attr),
            <$crate::fields::$kind as $crate::fields::FieldType>::KIND,
            &[$($target),*],
        )
        $(.named($remote))?
        $(.in_relation($rel))?
        $(.alias(stringify!($aliased)))?
    };

    (@field $attr:ident $kind:ident
        $(= $remote:literal)? $(in_relation $rel:literal)? $(alias $aliased:ident)?
    ) => {
        $crate::model::field::FieldModel::new(
            stringify!($attr),
            <$crate::fields::$kind as $crate::fields::FieldType>::KIND,
        )
        $(.named($remote))?
        $(.in_relation($rel))?
        $(.alias(stringify!($aliased)))?
    };

    // instance accessors

    (@accessors [$(#[$fmeta:meta])*] $attr:ident $kind:ident alias $aliased:ident) => {
        $crate::entity!(@getter [$(#[$fmeta])*] $attr $kind);
    };

    (@accessors [$(#[$fmeta:meta])*] $attr:ident $kind:ident) => {
        $crate::entity!(@getter [$(#[$fmeta])*] $attr $kind);

        $crate::__reexports::paste::paste! {
            pub fn [<set_ $attr>](
                &self,
                value: impl Into<
                    Option<<$crate::fields::$kind as $crate::fields::FieldType>::Value>,
                >,
            ) -> Result<(), $crate::db::record::EntityError> {
                let value = value.into().map_or(
                    $crate::value::Value::Null,
                    <$crate::fields::$kind as $crate::fields::FieldType>::into_value,
                );

                self.0.set(stringify!($attr), value)
            }

            pub fn [<with_ $attr>](
                self,
                value: impl Into<
                    Option<<$crate::fields::$kind as $crate::fields::FieldType>::Value>,
                >,
            ) -> Result<Self, $crate::db::record::EntityError> {
                self.[<set_ $attr>](value)?;

                Ok(self)
            }
        }
    };

    (@getter [$(#[$fmeta:meta])*] $attr:ident $kind:ident) => {
        $(#[$fmeta])*
        pub fn $attr(
            &self,
        ) -> Result<
            Option<<$crate::fields::$kind as $crate::fields::FieldType>::Value>,
            $crate::db::record::EntityError,
        > {
            self.0
                .get(stringify!($attr))
                .map(|value| {
                    <$crate::fields::$kind as $crate::fields::FieldType>::from_value(&value)
                })
        }
    };
}
