//! Builtin functions and named constants available to scripts.

mod stats;

use crate::language::errors::ErrorCode;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, argc: usize) -> bool {
        match self {
            Arity::Exact(n) => argc == n,
            Arity::AtLeast(n) => argc >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "{n}+"),
        }
    }
}

pub struct FunctionInfo {
    pub name: &'static str,
    pub arity: Arity,
    pub eval: fn(&[f64]) -> f64,
}

impl fmt::Debug for FunctionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// Script truthiness: any non-zero value, NaN included.
pub fn is_true(value: f64) -> bool {
    value != 0.0
}

pub fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

macro_rules! unary {
    ($name:literal, $body:expr) => {
        FunctionInfo {
            name: $name,
            arity: Arity::Exact(1),
            eval: |args| ($body)(args[0]),
        }
    };
}

macro_rules! variadic {
    ($name:literal, $body:path) => {
        FunctionInfo {
            name: $name,
            arity: Arity::AtLeast(1),
            eval: $body,
        }
    };
}

static FUNCTIONS: &[FunctionInfo] = &[
    unary!("abs", f64::abs),
    unary!("acos", f64::acos),
    unary!("asin", f64::asin),
    unary!("atan", f64::atan),
    FunctionInfo {
        name: "atan2",
        arity: Arity::Exact(2),
        eval: |args| args[0].atan2(args[1]),
    },
    unary!("ceil", f64::ceil),
    unary!("cos", f64::cos),
    unary!("degToRad", f64::to_radians),
    unary!("exp", f64::exp),
    unary!("floor", f64::floor),
    unary!("isinf", |v: f64| flag(v.is_infinite())),
    unary!("isnan", |v: f64| flag(v.is_nan())),
    unary!("isnull", |v: f64| flag(v.is_nan())),
    unary!("log", f64::ln),
    FunctionInfo {
        name: "log",
        arity: Arity::Exact(2),
        eval: |args| args[0].ln() / args[1].ln(),
    },
    unary!("radToDeg", f64::to_degrees),
    unary!("round", f64::round),
    FunctionInfo {
        name: "round",
        arity: Arity::Exact(2),
        eval: |args| (args[0] / args[1]).round() * args[1],
    },
    unary!("sign", |v: f64| if v.is_nan() || v == 0.0 { v } else { v.signum() }),
    unary!("sin", f64::sin),
    unary!("sqrt", f64::sqrt),
    unary!("tan", f64::tan),
    FunctionInfo {
        name: "con",
        arity: Arity::Exact(1),
        eval: |args| flag(is_true(args[0])),
    },
    FunctionInfo {
        name: "con",
        arity: Arity::Exact(2),
        eval: |args| if is_true(args[0]) { args[1] } else { 0.0 },
    },
    FunctionInfo {
        name: "con",
        arity: Arity::Exact(3),
        eval: |args| if is_true(args[0]) { args[1] } else { args[2] },
    },
    FunctionInfo {
        name: "con",
        arity: Arity::Exact(4),
        eval: |args| {
            if args[0] > 0.0 {
                args[1]
            } else if args[0] == 0.0 {
                args[2]
            } else {
                args[3]
            }
        },
    },
    variadic!("max", stats::max),
    variadic!("min", stats::min),
    variadic!("mean", stats::mean),
    variadic!("median", stats::median),
    variadic!("mode", stats::mode),
    variadic!("range", stats::range),
    variadic!("sdev", stats::sdev),
    variadic!("sum", stats::sum),
    variadic!("variance", stats::variance),
];

/// Finds the overload of `name` accepting `argc` arguments.
///
/// Fails with [`ErrorCode::FuncUndefined`] when no function has that name and
/// with [`ErrorCode::FuncArity`] when the name exists with other arities.
pub fn lookup(name: &str, argc: usize) -> Result<&'static FunctionInfo, ErrorCode> {
    let mut known = false;
    for info in FUNCTIONS.iter().filter(|info| info.name == name) {
        known = true;
        if info.arity.accepts(argc) {
            return Ok(info);
        }
    }
    Err(if known {
        ErrorCode::FuncArity
    } else {
        ErrorCode::FuncUndefined
    })
}

/// Arities accepted by `name`, for error help text.
pub fn arities(name: &str) -> Vec<Arity> {
    FUNCTIONS
        .iter()
        .filter(|info| info.name == name)
        .map(|info| info.arity)
        .collect()
}

/// Value of a reserved constant name.
pub fn constant(name: &str) -> Option<f64> {
    match name {
        "M_PI" => Some(std::f64::consts::PI),
        "M_E" => Some(std::f64::consts::E),
        "NaN" | "NULL" => Some(f64::NAN),
        _ => None,
    }
}
