//! Expression tree and evaluator.

use fxkit_math::LuminanceMath;

/// A named per-pixel input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Var {
    R,
    G,
    B,
    A,
    X,
    Y,
    Width,
    Height,
    Frame,
    Param(usize),
}

impl Var {
    pub(crate) fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "r" => Self::R,
            "g" => Self::G,
            "b" => Self::B,
            "a" => Self::A,
            "x" => Self::X,
            "y" => Self::Y,
            "width" => Self::Width,
            "height" => Self::Height,
            "frame" => Self::Frame,
            "param1" => Self::Param(0),
            "param2" => Self::Param(1),
            "param3" => Self::Param(2),
            "param4" => Self::Param(3),
            _ => return None,
        })
    }
}

/// Built-in function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Func {
    Abs,
    Sqrt,
    Exp,
    Log,
    Log10,
    Log2,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Pow,
    Min,
    Max,
    Clamp,
    Floor,
    Ceil,
    Round,
    Fract,
    Sign,
    Lerp,
    Step,
    Smoothstep,
    Luminance,
}

impl Func {
    pub(crate) fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "abs" => Self::Abs,
            "sqrt" => Self::Sqrt,
            "exp" => Self::Exp,
            "log" => Self::Log,
            "log10" => Self::Log10,
            "log2" => Self::Log2,
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "asin" => Self::Asin,
            "acos" => Self::Acos,
            "atan" => Self::Atan,
            "atan2" => Self::Atan2,
            "pow" => Self::Pow,
            "min" => Self::Min,
            "max" => Self::Max,
            "clamp" => Self::Clamp,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "round" => Self::Round,
            "fract" => Self::Fract,
            "sign" => Self::Sign,
            "lerp" => Self::Lerp,
            "step" => Self::Step,
            "smoothstep" => Self::Smoothstep,
            "luminance" => Self::Luminance,
            _ => return None,
        })
    }

    /// Number of arguments.
    pub(crate) fn arity(self) -> usize {
        match self {
            Self::Atan2 | Self::Pow | Self::Min | Self::Max | Self::Step => 2,
            Self::Clamp | Self::Lerp | Self::Smoothstep | Self::Luminance => 3,
            _ => 1,
        }
    }

    fn call(self, a: &[f64]) -> f64 {
        match self {
            Self::Abs => a[0].abs(),
            Self::Sqrt => a[0].sqrt(),
            Self::Exp => a[0].exp(),
            Self::Log => a[0].ln(),
            Self::Log10 => a[0].log10(),
            Self::Log2 => a[0].log2(),
            Self::Sin => a[0].sin(),
            Self::Cos => a[0].cos(),
            Self::Tan => a[0].tan(),
            Self::Asin => a[0].asin(),
            Self::Acos => a[0].acos(),
            Self::Atan => a[0].atan(),
            Self::Atan2 => a[0].atan2(a[1]),
            Self::Pow => a[0].powf(a[1]),
            Self::Min => a[0].min(a[1]),
            Self::Max => a[0].max(a[1]),
            Self::Clamp => a[0].max(a[1]).min(a[2]),
            Self::Floor => a[0].floor(),
            Self::Ceil => a[0].ceil(),
            Self::Round => a[0].round(),
            Self::Fract => a[0] - a[0].floor(),
            Self::Sign => {
                if a[0] > 0.0 {
                    1.0
                } else if a[0] < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }
            Self::Lerp => a[0] + (a[1] - a[0]) * a[2],
            Self::Step => {
                if a[1] < a[0] { 0.0 } else { 1.0 }
            }
            Self::Smoothstep => {
                let span = a[1] - a[0];
                if span == 0.0 {
                    return if a[2] < a[0] { 0.0 } else { 1.0 };
                }
                let t = ((a[2] - a[0]) / span).clamp(0.0, 1.0);
                t * t * (3.0 - 2.0 * t)
            }
            Self::Luminance => {
                LuminanceMath::Rec709.luminance(a[0] as f32, a[1] as f32, a[2] as f32) as f64
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    NotEq,
    And,
    Or,
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Num(f64),
    Var(Var),
    /// Reference to sub-expression 0 (`expr1`) or 1 (`expr2`)
    Sub(usize),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(Func, Vec<Expr>),
}

/// Inputs visible to an expression at one pixel.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Env {
    pub rgba: [f64; 4],
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub frame: f64,
    pub params: [f64; 4],
}

#[inline]
fn truth(v: f64) -> bool {
    v != 0.0
}

#[inline]
fn bool_value(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

impl Expr {
    /// Sub-expressions referenced anywhere in the tree.
    pub(crate) fn collect_subs(&self, out: &mut Vec<usize>) {
        match self {
            Self::Sub(i) => {
                if !out.contains(i) {
                    out.push(*i);
                }
            }
            Self::Num(_) | Self::Var(_) => {}
            Self::Unary(_, e) => e.collect_subs(out),
            Self::Binary(_, l, r) => {
                l.collect_subs(out);
                r.collect_subs(out);
            }
            Self::Ternary(c, t, f) => {
                c.collect_subs(out);
                t.collect_subs(out);
                f.collect_subs(out);
            }
            Self::Call(_, args) => args.iter().for_each(|a| a.collect_subs(out)),
        }
    }

    /// Replaces every [`Expr::Sub`] by the tree `resolve` returns for it.
    pub(crate) fn inline(self, resolve: &impl Fn(usize) -> Expr) -> Self {
        match self {
            Self::Sub(i) => resolve(i),
            Self::Num(_) | Self::Var(_) => self,
            Self::Unary(op, e) => Self::Unary(op, Box::new(e.inline(resolve))),
            Self::Binary(op, l, r) => Self::Binary(op, Box::new(l.inline(resolve)), Box::new(r.inline(resolve))),
            Self::Ternary(c, t, f) => Self::Ternary(
                Box::new(c.inline(resolve)),
                Box::new(t.inline(resolve)),
                Box::new(f.inline(resolve)),
            ),
            Self::Call(func, args) => Self::Call(func, args.into_iter().map(|a| a.inline(resolve)).collect()),
        }
    }

    /// Evaluates the tree. Unresolved sub-expression references read 0.
    pub(crate) fn eval(&self, env: &Env) -> f64 {
        match self {
            Self::Num(v) => *v,
            Self::Var(v) => match v {
                Var::R => env.rgba[0],
                Var::G => env.rgba[1],
                Var::B => env.rgba[2],
                Var::A => env.rgba[3],
                Var::X => env.x,
                Var::Y => env.y,
                Var::Width => env.width,
                Var::Height => env.height,
                Var::Frame => env.frame,
                Var::Param(i) => env.params[*i],
            },
            Self::Sub(_) => 0.0,
            Self::Unary(op, e) => {
                let v = e.eval(env);
                match op {
                    UnaryOp::Neg => -v,
                    UnaryOp::Not => bool_value(!truth(v)),
                }
            }
            Self::Binary(BinaryOp::And, l, r) => bool_value(truth(l.eval(env)) && truth(r.eval(env))),
            Self::Binary(BinaryOp::Or, l, r) => bool_value(truth(l.eval(env)) || truth(r.eval(env))),
            Self::Binary(op, l, r) => {
                let (a, b) = (l.eval(env), r.eval(env));
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Rem => a % b,
                    BinaryOp::Pow => a.powf(b),
                    BinaryOp::Less => bool_value(a < b),
                    BinaryOp::LessEq => bool_value(a <= b),
                    BinaryOp::Greater => bool_value(a > b),
                    BinaryOp::GreaterEq => bool_value(a >= b),
                    BinaryOp::Eq => bool_value(a == b),
                    BinaryOp::NotEq => bool_value(a != b),
                    BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators handled above"),
                }
            }
            Self::Ternary(c, t, f) => {
                if truth(c.eval(env)) {
                    t.eval(env)
                } else {
                    f.eval(env)
                }
            }
            Self::Call(func, args) => {
                let mut values = [0.0; 3];
                for (v, a) in values.iter_mut().zip(args) {
                    *v = a.eval(env);
                }
                func.call(&values[..args.len()])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothstep_and_step() {
        assert_eq!(Func::Step.call(&[0.5, 0.4]), 0.0);
        assert_eq!(Func::Step.call(&[0.5, 0.5]), 1.0);
        assert_eq!(Func::Smoothstep.call(&[0.0, 1.0, 0.5]), 0.5);
        assert_eq!(Func::Smoothstep.call(&[0.3, 0.3, 0.2]), 0.0);
    }

    #[test]
    fn test_inline_replaces_references() {
        let e = Expr::Binary(BinaryOp::Add, Box::new(Expr::Sub(0)), Box::new(Expr::Num(1.0)));
        let mut subs = Vec::new();
        e.collect_subs(&mut subs);
        assert_eq!(subs, vec![0]);

        let inlined = e.inline(&|_| Expr::Num(2.0));
        assert_eq!(inlined.eval(&Env::default()), 3.0);
    }
}
