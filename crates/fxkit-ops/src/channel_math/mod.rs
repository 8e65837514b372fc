//! Per-pixel expression kernel.
//!
//! Each of the four output channels may carry an expression; empty ones
//! pass the input value through. Two auxiliary expressions, `expr1` and
//! `expr2`, can be referenced from any other expression and are inlined
//! at compile time.
//!
//! A sub-expression that reaches itself, directly or through the other
//! one, is discarded with a warning and reads as `0` wherever it is used.
//!
//! # Language
//!
//! - numbers, `pi`
//! - `r g b a` (unpremultiplied input), `x y` (pixel), `width height frame`
//! - `param1` .. `param4`
//! - `+ - * / % ^`, unary `- !`, `< <= > >= == !=`, `&& ||`, `c ? a : b`
//! - `abs sqrt exp log log10 log2 sin cos tan asin acos atan atan2 pow min
//!   max clamp floor ceil round fract sign lerp step smoothstep luminance`
//!
//! # Usage
//!
//! ```rust
//! use fxkit_ops::{ChannelMath, ChannelMathParams, PixelKernel};
//!
//! let params = ChannelMathParams {
//!     expr1: "(r + g + b) / 3".into(),
//!     r: "expr1".into(),
//!     g: "expr1".into(),
//!     b: "expr1".into(),
//!     ..Default::default()
//! };
//! let kernel = ChannelMath::new(&params).unwrap();
//!
//! let mut px = [0.3, 0.6, 0.9, 1.0];
//! kernel.process(0, 0, &mut px);
//! assert!((px[0] - 0.6).abs() < 1e-6);
//! ```

mod ast;
mod lexer;
mod parser;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{OpsError, OpsResult, PixelKernel};
use ast::{Env, Expr};

const SUB_NAMES: [&str; 2] = ["expr1", "expr2"];
const CHANNEL_NAMES: [&str; 4] = ["r", "g", "b", "a"];

/// Expressions and inputs of [`ChannelMath`].
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ChannelMathParams {
    /// First auxiliary expression
    pub expr1: String,
    /// Second auxiliary expression
    pub expr2: String,
    /// Red output expression
    pub r: String,
    /// Green output expression
    pub g: String,
    /// Blue output expression
    pub b: String,
    /// Alpha output expression
    pub a: String,
    /// Values of `param1` .. `param4`
    pub params: [f32; 4],
    /// Value of `width`
    pub width: f32,
    /// Value of `height`
    pub height: f32,
    /// Value of `frame`
    pub frame: f64,
}

/// Compiled channel expressions.
#[derive(Debug, Clone)]
pub struct ChannelMath {
    channels: [Option<Expr>; 4],
    env: Env,
}

fn compile(name: &str, src: &str) -> OpsResult<Option<Expr>> {
    if src.trim().is_empty() {
        return Ok(None);
    }
    parser::parse(src).map(Some).map_err(|message| OpsError::Expression {
        channel: name.to_string(),
        message,
    })
}

/// True when sub-expression `start` can reach itself.
fn reaches_itself(start: usize, deps: &[Vec<usize>]) -> bool {
    let mut seen = vec![false; deps.len()];
    let mut stack = deps[start].clone();
    while let Some(i) = stack.pop() {
        if i == start {
            return true;
        }
        if !seen[i] {
            seen[i] = true;
            stack.extend(&deps[i]);
        }
    }
    false
}

/// Sub-expression `i` with all references inlined. Discarded or empty
/// sub-expressions become `0`.
fn resolve(i: usize, subs: &[Option<Expr>]) -> Expr {
    match &subs[i] {
        None => Expr::Num(0.0),
        Some(e) => e.clone().inline(&|j| resolve(j, subs)),
    }
}

impl ChannelMath {
    /// Parses every expression and inlines the auxiliary ones.
    ///
    /// # Errors
    ///
    /// [`OpsError::Expression`] naming the first expression that fails to
    /// parse or uses an unknown identifier.
    pub fn new(params: &ChannelMathParams) -> OpsResult<Self> {
        let mut subs = [compile(SUB_NAMES[0], &params.expr1)?, compile(SUB_NAMES[1], &params.expr2)?];

        let deps: Vec<Vec<usize>> = subs
            .iter()
            .map(|s| {
                let mut out = Vec::new();
                if let Some(e) = s {
                    e.collect_subs(&mut out);
                }
                out
            })
            .collect();
        let cyclic: Vec<bool> = (0..subs.len()).map(|i| reaches_itself(i, &deps)).collect();
        for (i, sub) in subs.iter_mut().enumerate() {
            if cyclic[i] {
                warn!(expression = SUB_NAMES[i], "expression references itself, discarded");
                *sub = None;
            }
        }

        let sources = [&params.r, &params.g, &params.b, &params.a];
        let mut channels: [Option<Expr>; 4] = Default::default();
        for (c, src) in sources.iter().enumerate() {
            channels[c] = compile(CHANNEL_NAMES[c], src)?.map(|e| e.inline(&|j| resolve(j, &subs)));
        }

        let env = Env {
            width: params.width as f64,
            height: params.height as f64,
            frame: params.frame,
            params: params.params.map(f64::from),
            ..Default::default()
        };
        Ok(Self { channels, env })
    }

    /// True when no channel carries an expression.
    pub fn is_identity(&self) -> bool {
        self.channels.iter().all(Option::is_none)
    }
}

impl PixelKernel for ChannelMath {
    fn process(&self, x: i32, y: i32, pix: &mut [f32; 4]) {
        let env = Env {
            rgba: pix.map(f64::from),
            x: x as f64,
            y: y as f64,
            ..self.env
        };
        for (v, expr) in pix.iter_mut().zip(&self.channels) {
            if let Some(expr) = expr {
                let out = expr.eval(&env) as f32;
                *v = if out.is_finite() { out } else { 0.0 };
            }
        }
    }
}
