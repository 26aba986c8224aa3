use crate::arena::Arena;
use crate::value::Value;

/// Render a value to a string in dotted-pair notation. Lists get no
/// sugar: `(1 2)` prints as `(1.(2.()))`.
pub fn print_val(val: Value, arena: &Arena) -> String {
    let mut out = String::new();
    print_inner(val, arena, &mut out, 0);
    out
}

fn print_inner(val: Value, arena: &Arena, out: &mut String, depth: usize) {
    if depth > 1000 {
        out.push_str("...");
        return;
    }

    match val {
        Value::Nil => out.push_str("()"),
        Value::Atom(id) => out.push_str(arena.atom_text(id)),
        Value::Primitive(p) => {
            out.push_str("#<primitive ");
            out.push_str(p.name());
            out.push('>');
        }
        Value::Pair(id) => {
            // A procedure prints opaquely: its fourth element is the captured
            // environment, which can reach the closure itself.
            if is_proc(val, arena) {
                out.push_str("#<procedure>");
                return;
            }
            out.push('(');
            print_inner(arena.car(id), arena, out, depth + 1);
            out.push('.');
            print_inner(arena.cdr(id), arena, out, depth + 1);
            out.push(')');
        }
    }
}

/// A pair chain whose head is the atom "proc".
fn is_proc(val: Value, arena: &Arena) -> bool {
    let id = match val.as_pair() {
        Some(id) => id,
        None => return false,
    };
    match arena.car(id).as_atom() {
        Some(head) => arena.atom_text(head) == "proc",
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_str;

    #[test]
    fn nil_prints_as_empty_parens() {
        let arena = Arena::new(8);
        assert_eq!(print_val(Value::Nil, &arena), "()");
    }

    #[test]
    fn lists_print_dotted() {
        let mut arena = Arena::new(64);
        let val = read_str("(1 2)", &mut arena).unwrap();
        assert_eq!(print_val(val, &arena), "(1.(2.()))");
    }

    #[test]
    fn atoms_print_raw() {
        let mut arena = Arena::new(64);
        let val = read_str("hello", &mut arena).unwrap();
        assert_eq!(print_val(val, &arena), "hello");
    }

    #[test]
    fn procedures_print_opaquely() {
        let mut arena = Arena::new(64);
        // Hand-built (proc () body env) shape; the env slot may point
        // anywhere without affecting printing.
        let tag = arena.alloc_atom("proc").unwrap();
        let body = arena.alloc_atom("x").unwrap();
        let proc = arena.list(&[tag, Value::Nil, body, Value::Nil]).unwrap();
        assert_eq!(print_val(proc, &arena), "#<procedure>");
    }

    #[test]
    fn cyclic_pairs_do_not_hang_the_printer() {
        let mut arena = Arena::new(64);
        let pair = arena.alloc_pair(Value::Nil, Value::Nil).unwrap();
        arena.set_cdr(pair.as_pair().unwrap(), pair);
        let text = print_val(pair, &arena);
        assert!(text.contains("..."));
    }
}
