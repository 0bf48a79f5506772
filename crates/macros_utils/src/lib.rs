//! Small declarative helpers shared by the HTTP apps.

#[cfg(feature = "actix")]
#[doc(hidden)]
pub mod __private {
    pub use actix_web;
}

/// Generates `pub fn routes(cfg: &mut ServiceConfig)` for the current module.
///
/// `route handler` registers an actix handler, `load module` mounts the
/// `routes` function of a child module.
///
/// ```ignore
/// macros_utils::routes! {
///     load health,
///     route list_sites,
/// }
/// ```
#[cfg(feature = "actix")]
#[macro_export]
macro_rules! routes {
    ($($kind:ident $target:ident),* $(,)?) => {
        pub fn routes(cfg: &mut $crate::__private::actix_web::web::ServiceConfig) {
            $( $crate::__route_entry!(cfg, $kind $target); )*
        }
    };
}

#[cfg(feature = "actix")]
#[doc(hidden)]
#[macro_export]
macro_rules! __route_entry {
    ($cfg:ident, route $handler:ident) => {
        $cfg.service($handler);
    };
    ($cfg:ident, load $module:ident) => {
        $cfg.configure($module::routes);
    };
}
