//! Small helper macros for the API crate.

/// Implement `FromRef<AppState>` for a field of the state.
///
/// Axum's `State` extractor pulls substates out of `AppState` via `FromRef`;
/// this macro removes the per-field boilerplate.
#[macro_export]
macro_rules! impl_from_ref {
    ($ty:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $ty {
            fn from_ref(state: &$crate::state::AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}
