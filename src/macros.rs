pub use enclose::*;

/// Build a [`Computed`](crate::reactive::Computed), cloning the listed
/// handles into the closure.
///
/// ```ignore
/// let doubled = computed!((count) ev => *count.get(ev) * 2);
/// ```
#[macro_export]
macro_rules! computed {
    (( $($d_tt:tt)* ) $ctx:ident => $($b:tt)*) => {
        $crate::reactive::Computed::new($crate::macros::enclose!(($( $d_tt )*) Box::new(move |$ctx: &$crate::reactive::Evaluation| { $($b)* })))
    };
    ($ctx:ident => $($b:tt)*) => {
        $crate::reactive::Computed::new(Box::new(move |$ctx: &$crate::reactive::Evaluation| { $($b)* }))
    };
}

/// Subscribe a named [`Reaction`](crate::reactive::Reaction) and run it once.
#[macro_export]
macro_rules! reaction {
    ($name:literal ( $($d_tt:tt)* ) $ctx:ident => $($b:tt)*) => {
        $crate::reactive::Reaction::subscribe($name, $crate::macros::enclose!(($( $d_tt )*) Box::new(move |$ctx: &$crate::reactive::Evaluation| { $($b)* })))
    };
    ($name:literal $ctx:ident => $($b:tt)*) => {
        $crate::reactive::Reaction::subscribe($name, Box::new(move |$ctx: &$crate::reactive::Evaluation| { $($b)* }))
    };
}
