//! Lexical environments.
//!
//! An environment is arena-resident pair structure: `(frame . parent)` where
//! `frame` is an association list of `(name-atom . value)` bindings and
//! `parent` is the enclosing environment, Nil at the global level. Frames
//! being ordinary pairs means the collector traces and compacts them with
//! everything else, and a closure's captured environment keeps it alive.

use crate::arena::Arena;
use crate::error::{SexprError, SexprResult};
use crate::value::Value;

/// Walk the frame chain innermost-first and return the first binding's value.
pub fn lookup(name: &str, env: Value, arena: &Arena) -> SexprResult<Value> {
    let mut current = env;
    while let Value::Pair(env_id) = current {
        let mut frame = arena.car(env_id);
        while let Value::Pair(frame_id) = frame {
            let binding = arena.car(frame_id);
            if let Value::Pair(binding_id) = binding {
                if key_text(binding, arena) == Some(name) {
                    return Ok(arena.cdr(binding_id));
                }
            }
            frame = arena.cdr(frame_id);
        }
        current = arena.cdr(env_id);
    }
    Err(SexprError::Unbound(name.to_string()))
}

/// Bind `name` in the innermost frame of `env`. An existing binding in this
/// frame is overwritten in place — one frame never holds duplicate keys — but
/// a same-named binding in an ancestor is shadowed, not touched. `define`.
pub fn bind(name: Value, val: Value, env: Value, arena: &mut Arena) -> SexprResult<()> {
    let env_id = match env {
        Value::Pair(id) => id,
        _ => unreachable!("environment is not a pair"),
    };
    let name_text = match name {
        Value::Atom(id) => arena.atom_text(id).to_string(),
        _ => unreachable!("binding name is not an atom"),
    };

    let mut frame = arena.car(env_id);
    while let Value::Pair(frame_id) = frame {
        let binding = arena.car(frame_id);
        if let Value::Pair(binding_id) = binding {
            if key_text(binding, arena) == Some(&name_text) {
                arena.set_cdr(binding_id, val);
                return Ok(());
            }
        }
        frame = arena.cdr(frame_id);
    }

    // Not bound here yet: prepend a fresh (name . val) entry.
    let binding = arena.alloc_pair(name, val)?;
    let old_frame = arena.car(env_id);
    let new_frame = arena.alloc_pair(binding, old_frame)?;
    arena.set_car(env_id, new_frame);
    Ok(())
}

/// Mutate an existing binding anywhere in the chain, searched like `lookup`.
/// Fails with `Unbound` when no frame holds the name. `set!`.
pub fn assign(name: &str, val: Value, env: Value, arena: &mut Arena) -> SexprResult<()> {
    let mut current = env;
    while let Value::Pair(env_id) = current {
        let mut frame = arena.car(env_id);
        while let Value::Pair(frame_id) = frame {
            let binding = arena.car(frame_id);
            if let Value::Pair(binding_id) = binding {
                if key_text(binding, arena) == Some(name) {
                    arena.set_cdr(binding_id, val);
                    return Ok(());
                }
            }
            frame = arena.cdr(frame_id);
        }
        current = arena.cdr(env_id);
    }
    Err(SexprError::Unbound(name.to_string()))
}

/// Build a new frame pairing `params` with already-evaluated `args`
/// positionally, chained onto `parent`. The lists must be the same length.
pub fn extend(
    params: Value,
    args: Value,
    parent: Value,
    arena: &mut Arena,
) -> SexprResult<Value> {
    let expected = arena.list_len(params).unwrap_or(0);
    let got = arena.list_len(args).unwrap_or(0);
    if expected != got {
        return Err(SexprError::Arity {
            name: "procedure".to_string(),
            expected,
            got,
        });
    }

    let mut frame = Value::Nil;
    let mut p = params;
    let mut a = args;
    while let (Value::Pair(p_id), Value::Pair(a_id)) = (p, a) {
        let binding = arena.alloc_pair(arena.car(p_id), arena.car(a_id))?;
        frame = arena.alloc_pair(binding, frame)?;
        p = arena.cdr(p_id);
        a = arena.cdr(a_id);
    }
    arena.alloc_pair(frame, parent)
}

fn key_text(binding: Value, arena: &Arena) -> Option<&str> {
    let binding_id = binding.as_pair()?;
    let key_id = arena.car(binding_id).as_atom()?;
    Some(arena.atom_text(key_id))
}
