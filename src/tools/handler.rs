//! Statically-typed tool functions turned into cached callable handles.
//!
//! A tool body is any `Fn(&T, A1, .., An) -> R` with `n <= 6`, `Ai: ToolArg`
//! and `R: IntoToolOutput`. Converting it erases the argument types once, at
//! registration, so that each invocation is a direct call through an `Arc`.

use serde_json::Value;
use std::sync::Arc;

use super::output::{IntoToolOutput, Outcome};
use super::params::{Coercion, ParamType, ToolArg};

/// Handle for a zero-argument tool.
pub type ZeroArgCall<T> = Arc<dyn Fn(&T) -> Outcome + Send + Sync>;

/// Handle for a parameterized tool. Receives exactly one value per declared
/// parameter, in declaration order; absent optional values arrive as `null`.
pub type ParamCall<T> =
    Arc<dyn Fn(&T, &[Value], Coercion) -> Result<Outcome, BindFailure> + Send + Sync>;

/// A single parameter that could not be bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindFailure {
    pub index: usize,
    pub message: String,
}

/// Arity-erased callable produced from a tool function.
pub enum Callable<T> {
    ZeroArg(ZeroArgCall<T>),
    Parameterized(ParamCall<T>),
}

impl<T> std::fmt::Debug for Callable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Callable::ZeroArg(_) => f.write_str("Callable::ZeroArg"),
            Callable::Parameterized(_) => f.write_str("Callable::Parameterized"),
        }
    }
}

/// A function usable as the body of a tool on target type `T`.
///
/// `Args` is the tuple of parameter types; it only exists to keep the
/// per-arity implementations apart and is inferred at the call site.
pub trait ToolFn<T, Args>: Send + Sync + 'static {
    /// Declared parameter types, in order.
    fn param_types() -> Vec<ParamType>;

    fn into_callable(self) -> Callable<T>;
}

impl<T, F, R> ToolFn<T, ()> for F
where
    T: 'static,
    F: Fn(&T) -> R + Send + Sync + 'static,
    R: IntoToolOutput,
{
    fn param_types() -> Vec<ParamType> {
        Vec::new()
    }

    fn into_callable(self) -> Callable<T> {
        Callable::ZeroArg(Arc::new(move |target: &T| (self)(target).into_output()))
    }
}

fn bind_one<A: ToolArg>(
    args: &[Value],
    index: usize,
    coercion: Coercion,
) -> Result<A, BindFailure> {
    let value = args.get(index).ok_or_else(|| BindFailure {
        index,
        message: "missing value".to_string(),
    })?;
    A::from_arg(value, coercion).map_err(|message| BindFailure { index, message })
}

macro_rules! impl_tool_fn {
    ($count:expr; $($arg:ident $val:ident $idx:tt),+) => {
        impl<T, F, R, $($arg,)+> ToolFn<T, ($($arg,)+)> for F
        where
            T: 'static,
            F: Fn(&T, $($arg),+) -> R + Send + Sync + 'static,
            R: IntoToolOutput,
            $($arg: ToolArg + 'static,)+
        {
            fn param_types() -> Vec<ParamType> {
                vec![$($arg::param_type()),+]
            }

            fn into_callable(self) -> Callable<T> {
                Callable::Parameterized(Arc::new(
                    move |target: &T, args: &[Value], coercion: Coercion| {
                        if args.len() != $count {
                            return Err(BindFailure {
                                index: args.len().min($count),
                                message: format!(
                                    "expected {} arguments, got {}",
                                    $count,
                                    args.len()
                                ),
                            });
                        }
                        $(let $val = bind_one::<$arg>(args, $idx, coercion)?;)+
                        Ok((self)(target, $($val),+).into_output())
                    },
                ))
            }
        }
    };
}

impl_tool_fn!(1; A1 a1 0);
impl_tool_fn!(2; A1 a1 0, A2 a2 1);
impl_tool_fn!(3; A1 a1 0, A2 a2 1, A3 a3 2);
impl_tool_fn!(4; A1 a1 0, A2 a2 1, A3 a3 2, A4 a4 3);
impl_tool_fn!(5; A1 a1 0, A2 a2 1, A3 a3 2, A4 a4 3, A5 a5 4);
impl_tool_fn!(6; A1 a1 0, A2 a2 1, A3 a3 2, A4 a4 3, A5 a5 4, A6 a6 5);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Calculator {
        offset: i64,
    }

    impl Calculator {
        fn zero(&self) -> i64 {
            self.offset
        }

        fn add(&self, a: i64, b: i64) -> i64 {
            self.offset + a + b
        }
    }

    fn callable<Args, F: ToolFn<Calculator, Args>>(f: F) -> Callable<Calculator> {
        f.into_callable()
    }

    #[test]
    fn test_zero_arg_handle() {
        let calc = Calculator { offset: 7 };
        match callable(Calculator::zero) {
            Callable::ZeroArg(call) => assert_eq!(call(&calc).unwrap(), json!(7)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_param_handle_binds_in_order() {
        let calc = Calculator { offset: 0 };
        let Callable::Parameterized(call) = callable(Calculator::add) else {
            panic!("expected parameterized");
        };
        let out = call(&calc, &[json!(2), json!(3)], Coercion::Strict).unwrap();
        assert_eq!(out.unwrap(), json!(5));
    }

    #[test]
    fn test_param_handle_reports_failing_index() {
        let calc = Calculator { offset: 0 };
        let Callable::Parameterized(call) = callable(Calculator::add) else {
            panic!("expected parameterized");
        };
        let err = call(&calc, &[json!(2), json!("x")], Coercion::Strict).unwrap_err();
        assert_eq!(err.index, 1);

        let err = call(&calc, &[json!(2)], Coercion::Strict).unwrap_err();
        assert_eq!(err.message, "expected 2 arguments, got 1");
    }

    #[test]
    fn test_param_types_follow_signature() {
        fn types<Args, F: ToolFn<Calculator, Args>>(_f: &F) -> Vec<ParamType> {
            F::param_types()
        }
        let f = |_c: &Calculator, _name: String, _limit: Option<u32>, _tags: Vec<String>| 0;
        assert_eq!(
            types(&f),
            vec![
                ParamType::String,
                ParamType::Optional(Box::new(ParamType::Int)),
                ParamType::List(Box::new(ParamType::String)),
            ]
        );
    }
}
