use crate::arena::Arena;
use crate::env;
use crate::error::SexprResult;
use crate::primitives::Primitive;
use crate::value::Value;

/// Populate the global frame: every primitive under its name, plus the
/// boolean sentinels under `#t` and `#f` so programs can write them as
/// ordinary symbols.
pub fn install(
    arena: &mut Arena,
    globe: Value,
    truth: Value,
    falsehood: Value,
) -> SexprResult<()> {
    for prim in Primitive::ALL {
        let name = arena.alloc_atom(prim.name())?;
        env::bind(name, Value::Primitive(prim), globe, arena)?;
    }

    let t_name = arena.alloc_atom("#t")?;
    env::bind(t_name, truth, globe, arena)?;
    let f_name = arena.alloc_atom("#f")?;
    env::bind(f_name, falsehood, globe, arena)?;
    Ok(())
}
