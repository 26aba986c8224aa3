use crate::error::{SexprError, SexprResult};
use crate::eval::Interp;
use crate::value::Value;

/// The built-in procedures. A `Value::Primitive` carries one of these
/// directly — primitives live outside the arena and are never swept.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Primitive {
    Add,
    Sub,
    Mul,
    Div,
    Cons,
    Car,
    Cdr,
    IsEq,
    Lt,
    Gt,
    Le,
    Ge,
    NumEq,
    SetCar,
    SetCdr,
}

impl Primitive {
    /// Every primitive, in the order they are installed globally.
    pub const ALL: [Primitive; 15] = [
        Primitive::Add,
        Primitive::Sub,
        Primitive::Mul,
        Primitive::Div,
        Primitive::Cons,
        Primitive::Car,
        Primitive::Cdr,
        Primitive::IsEq,
        Primitive::Lt,
        Primitive::Gt,
        Primitive::Le,
        Primitive::Ge,
        Primitive::NumEq,
        Primitive::SetCar,
        Primitive::SetCdr,
    ];

    /// The name the primitive is bound to in the global frame.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Add => "+",
            Primitive::Sub => "-",
            Primitive::Mul => "*",
            Primitive::Div => "/",
            Primitive::Cons => "cons",
            Primitive::Car => "car",
            Primitive::Cdr => "cdr",
            Primitive::IsEq => "eq?",
            Primitive::Lt => "<",
            Primitive::Gt => ">",
            Primitive::Le => "<=",
            Primitive::Ge => ">=",
            Primitive::NumEq => "=",
            Primitive::SetCar => "set-car!",
            Primitive::SetCdr => "set-cdr!",
        }
    }
}

/// Dispatch a primitive call. `args` is the already-evaluated argument list.
pub fn call_primitive(prim: Primitive, args: Value, interp: &mut Interp) -> SexprResult<Value> {
    let argv = match interp.arena.list_to_vec(args) {
        Some(argv) => argv,
        None => {
            return Err(SexprError::InvalidArgument(format!(
                "{}: argument list is not a proper list",
                prim.name()
            )))
        }
    };

    match prim {
        Primitive::Add => prim_add(&argv, interp),
        Primitive::Sub => prim_sub(&argv, interp),
        Primitive::Mul => prim_mul(&argv, interp),
        Primitive::Div => prim_div(&argv, interp),
        Primitive::Cons => prim_cons(&argv, interp),
        Primitive::Car => prim_car(&argv, interp),
        Primitive::Cdr => prim_cdr(&argv, interp),
        Primitive::IsEq => prim_is_eq(&argv, interp),
        Primitive::Lt => prim_compare(prim, &argv, interp, |a, b| a < b),
        Primitive::Gt => prim_compare(prim, &argv, interp, |a, b| a > b),
        Primitive::Le => prim_compare(prim, &argv, interp, |a, b| a <= b),
        Primitive::Ge => prim_compare(prim, &argv, interp, |a, b| a >= b),
        Primitive::NumEq => prim_compare(prim, &argv, interp, |a, b| a == b),
        Primitive::SetCar => prim_set_slot(prim, &argv, interp),
        Primitive::SetCdr => prim_set_slot(prim, &argv, interp),
    }
}

/// Convert an atom to an integer. Accepts an optional leading '-' so
/// computed negatives flow back through arithmetic; self-evaluation of
/// atoms stays digits-only. A leading '+' is a symbol, not a sign.
fn to_int(name: &str, val: Value, interp: &Interp) -> SexprResult<i64> {
    if let Some(id) = val.as_atom() {
        let text = interp.arena.atom_text(id);
        if !text.starts_with('+') {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(n);
            }
        }
    }
    Err(SexprError::InvalidArgument(format!(
        "{}: non-numeral argument",
        name
    )))
}

fn arity(name: &str, expected: usize, got: usize) -> SexprError {
    SexprError::Arity {
        name: name.to_string(),
        expected,
        got,
    }
}

fn overflow(name: &str) -> SexprError {
    SexprError::InvalidArgument(format!("{name}: integer overflow"))
}

/// (+ e...) — sum, 0 when empty.
fn prim_add(argv: &[Value], interp: &mut Interp) -> SexprResult<Value> {
    let mut sum = 0i64;
    for &arg in argv {
        sum = sum
            .checked_add(to_int("+", arg, interp)?)
            .ok_or_else(|| overflow("+"))?;
    }
    interp.make_number(sum)
}

/// (- e...) — unary form negates; otherwise fold from the first operand.
fn prim_sub(argv: &[Value], interp: &mut Interp) -> SexprResult<Value> {
    match argv {
        [] => Err(arity("-", 1, 0)),
        [only] => {
            let n = to_int("-", *only, interp)?;
            let negated = n.checked_neg().ok_or_else(|| overflow("-"))?;
            interp.make_number(negated)
        }
        [first, rest @ ..] => {
            let mut diff = to_int("-", *first, interp)?;
            for &arg in rest {
                diff = diff
                    .checked_sub(to_int("-", arg, interp)?)
                    .ok_or_else(|| overflow("-"))?;
            }
            interp.make_number(diff)
        }
    }
}

/// (* e...) — product, 1 when empty.
fn prim_mul(argv: &[Value], interp: &mut Interp) -> SexprResult<Value> {
    let mut prod = 1i64;
    for &arg in argv {
        prod = prod
            .checked_mul(to_int("*", arg, interp)?)
            .ok_or_else(|| overflow("*"))?;
    }
    interp.make_number(prod)
}

/// (/ e...) — unary form is the integer reciprocal; otherwise fold from
/// the first operand. Division by zero is an error, not a crash.
fn prim_div(argv: &[Value], interp: &mut Interp) -> SexprResult<Value> {
    let divide = |num: i64, den: i64| -> SexprResult<i64> {
        if den == 0 {
            return Err(SexprError::InvalidArgument(
                "/: division by zero".to_string(),
            ));
        }
        // i64::MIN / -1 is the one remaining overflow case.
        num.checked_div(den).ok_or_else(|| overflow("/"))
    };

    match argv {
        [] => Err(arity("/", 1, 0)),
        [only] => {
            let n = to_int("/", *only, interp)?;
            let quot = divide(1, n)?;
            interp.make_number(quot)
        }
        [first, rest @ ..] => {
            let mut quot = to_int("/", *first, interp)?;
            for &arg in rest {
                quot = divide(quot, to_int("/", arg, interp)?)?;
            }
            interp.make_number(quot)
        }
    }
}

/// (cons a b)
fn prim_cons(argv: &[Value], interp: &mut Interp) -> SexprResult<Value> {
    match argv {
        [car, cdr] => interp.arena.alloc_pair(*car, *cdr),
        _ => Err(arity("cons", 2, argv.len())),
    }
}

/// (car p) — p must be a pair.
fn prim_car(argv: &[Value], interp: &mut Interp) -> SexprResult<Value> {
    match argv {
        [arg] => match arg.as_pair() {
            Some(id) => Ok(interp.arena.car(id)),
            None => Err(SexprError::InvalidArgument("car: not a pair".to_string())),
        },
        _ => Err(arity("car", 1, argv.len())),
    }
}

/// (cdr p) — p must be a pair.
fn prim_cdr(argv: &[Value], interp: &mut Interp) -> SexprResult<Value> {
    match argv {
        [arg] => match arg.as_pair() {
            Some(id) => Ok(interp.arena.cdr(id)),
            None => Err(SexprError::InvalidArgument("cdr: not a pair".to_string())),
        },
        _ => Err(arity("cdr", 1, argv.len())),
    }
}

/// (eq? e...) — strict cell identity against the first argument. Atoms are
/// never interned, so equal text does not imply eq?.
fn prim_is_eq(argv: &[Value], interp: &mut Interp) -> SexprResult<Value> {
    let first = match argv.first() {
        Some(first) => *first,
        None => return Err(arity("eq?", 1, 0)),
    };
    let all_same = argv.iter().all(|&arg| arg == first);
    Ok(interp.boolean(all_same))
}

/// Pairwise-consecutive numeral comparison, short-circuiting to #f at the
/// first failing adjacent pair. Arguments past that pair are never
/// inspected, so a trailing non-numeral does not turn #f into an error.
fn prim_compare(
    prim: Primitive,
    argv: &[Value],
    interp: &mut Interp,
    cmp: fn(i64, i64) -> bool,
) -> SexprResult<Value> {
    let mut prev = match argv.first() {
        Some(&first) => to_int(prim.name(), first, interp)?,
        None => return Ok(interp.boolean(true)),
    };
    for &arg in &argv[1..] {
        let next = to_int(prim.name(), arg, interp)?;
        if !cmp(prev, next) {
            return Ok(interp.boolean(false));
        }
        prev = next;
    }
    Ok(interp.boolean(true))
}

/// (set-car! p v) / (set-cdr! p v) — mutate a pair slot in place. The only
/// way cyclic structure can arise.
fn prim_set_slot(prim: Primitive, argv: &[Value], interp: &mut Interp) -> SexprResult<Value> {
    match argv {
        [target, val] => {
            let id = target.as_pair().ok_or_else(|| {
                SexprError::InvalidArgument(format!("{}: not a pair", prim.name()))
            })?;
            if prim == Primitive::SetCar {
                interp.arena.set_car(id, *val);
            } else {
                interp.arena.set_cdr(id, *val);
            }
            Ok(interp.ok)
        }
        _ => Err(arity(prim.name(), 2, argv.len())),
    }
}
