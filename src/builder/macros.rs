//! Macros for ergonomic state definitions.

/// Generate a state enum together with its `State` implementation.
///
/// # Example
///
/// ```
/// use keyed_fsm::state_enum;
/// use keyed_fsm::core::State;
///
/// state_enum! {
///     pub enum JobState {
///         Idle,
///         Processing,
///         Done,
///     }
/// }
///
/// assert_eq!(JobState::Processing.name(), "Processing");
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }
    };
}
