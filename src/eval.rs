use crate::arena::Arena;
use crate::env;
use crate::error::{SexprError, SexprResult};
use crate::globals;
use crate::primitives;
use crate::reader;
use crate::value::Value;

/// One interpreter instance. All state lives here — the arena, the global
/// environment, the sentinel atoms, and the sticky error slot — so the
/// collector can find its roots and independent instances never share
/// storage.
pub struct Interp {
    pub arena: Arena,
    /// The global environment: (frame . Nil).
    pub globe: Value,
    /// Result of define/set!/set-car!/set-cdr!.
    pub ok: Value,
    /// Boolean sentinels. `if` tests against `falsehood` by identity;
    /// everything else counts as true.
    pub truth: Value,
    pub falsehood: Value,
    /// Most recent error of the current top-level pass. First error wins;
    /// the driver reads and clears it after each form.
    last_error: Option<SexprError>,
}

impl Interp {
    pub fn new(capacity: usize) -> SexprResult<Self> {
        let mut arena = Arena::new(capacity);
        let globe = arena.alloc_pair(Value::Nil, Value::Nil)?;
        let ok = arena.alloc_atom("ok")?;
        let truth = arena.alloc_atom("#t")?;
        let falsehood = arena.alloc_atom("#f")?;
        globals::install(&mut arena, globe, truth, falsehood)?;

        Ok(Interp {
            arena,
            globe,
            ok,
            truth,
            falsehood,
            last_error: None,
        })
    }

    /// Discard all state and start over with the same capacity.
    pub fn reset(&mut self) -> SexprResult<()> {
        *self = Interp::new(self.arena.capacity())?;
        Ok(())
    }

    pub fn boolean(&self, b: bool) -> Value {
        if b {
            self.truth
        } else {
            self.falsehood
        }
    }

    /// Allocate an integer result atom.
    pub fn make_number(&mut self, n: i64) -> SexprResult<Value> {
        self.arena.alloc_atom(&n.to_string())
    }

    // ========================================================================
    // Core evaluation
    // ========================================================================

    /// Evaluate an expression in an environment. Ordinary native recursion:
    /// depth is bounded by the host stack, an accepted resource limit.
    pub fn eval(&mut self, expr: Value, env: Value) -> SexprResult<Value> {
        match expr {
            Value::Nil => Ok(Value::Nil),
            Value::Atom(id) => {
                let text = self.arena.atom_text(id);
                if is_numeral(text) {
                    return Ok(expr);
                }
                let name = text.to_string();
                env::lookup(&name, env, &self.arena)
            }
            Value::Pair(id) => {
                if let Some(head) = self.arena.car(id).as_atom() {
                    let tag = self.arena.atom_text(head).to_string();
                    match tag.as_str() {
                        "quote" => return self.eval_quote(expr),
                        "lambda" => return self.eval_lambda(expr, env),
                        "define" => return self.eval_define(expr, env),
                        "set!" => return self.eval_set(expr, env),
                        "if" => return self.eval_if(expr, env),
                        "begin" => return self.eval_begin(expr, env),
                        _ => {}
                    }
                }
                self.eval_application(expr, env)
            }
            Value::Primitive(_) => Err(SexprError::NotApplicable(
                "a bare primitive is not an evaluable form".to_string(),
            )),
        }
    }

    /// Collect a special form into its elements, requiring a proper list.
    fn form_items(&self, expr: Value, form: &str) -> SexprResult<Vec<Value>> {
        self.arena.list_to_vec(expr).ok_or_else(|| {
            SexprError::MalformedForm(format!("{form}: not a proper list"))
        })
    }

    /// (quote x) — return x unevaluated.
    fn eval_quote(&mut self, expr: Value) -> SexprResult<Value> {
        let items = self.form_items(expr, "quote")?;
        if items.len() != 2 {
            return Err(SexprError::MalformedForm(
                "quote expects exactly one argument".to_string(),
            ));
        }
        Ok(items[1])
    }

    /// (lambda (params...) body) — build (proc params body env).
    fn eval_lambda(&mut self, expr: Value, env: Value) -> SexprResult<Value> {
        let items = self.form_items(expr, "lambda")?;
        if items.len() != 3 {
            return Err(SexprError::MalformedForm(
                "lambda expects a parameter list and one body expression".to_string(),
            ));
        }
        let params = items[1];
        let body = items[2];

        let param_list = self.arena.list_to_vec(params).ok_or_else(|| {
            SexprError::MalformedForm("lambda parameters must be a list".to_string())
        })?;
        for param in param_list {
            if !is_symbol(param, &self.arena) {
                return Err(SexprError::MalformedForm(
                    "lambda parameters must be plain symbols".to_string(),
                ));
            }
        }

        let tag = self.arena.alloc_atom("proc")?;
        self.arena.list(&[tag, params, body, env])
    }

    /// (define name expr) — evaluate, bind in the current frame, return ok.
    fn eval_define(&mut self, expr: Value, env: Value) -> SexprResult<Value> {
        let items = self.form_items(expr, "define")?;
        if items.len() != 3 {
            return Err(SexprError::MalformedForm(
                "define expects a name and one expression".to_string(),
            ));
        }
        let name = items[1];
        if !is_symbol(name, &self.arena) {
            return Err(SexprError::MalformedForm(
                "define name must be a plain symbol".to_string(),
            ));
        }
        let val = self.eval(items[2], env)?;
        env::bind(name, val, env, &mut self.arena)?;
        Ok(self.ok)
    }

    /// (set! name expr) — mutate an existing binding anywhere in the chain.
    fn eval_set(&mut self, expr: Value, env: Value) -> SexprResult<Value> {
        let items = self.form_items(expr, "set!")?;
        if items.len() != 3 {
            return Err(SexprError::MalformedForm(
                "set! expects a name and one expression".to_string(),
            ));
        }
        let name_id = match items[1] {
            Value::Atom(id) if is_symbol(items[1], &self.arena) => id,
            _ => {
                return Err(SexprError::MalformedForm(
                    "set! name must be a plain symbol".to_string(),
                ))
            }
        };
        let val = self.eval(items[2], env)?;
        let name = self.arena.atom_text(name_id).to_string();
        env::assign(&name, val, env, &mut self.arena)?;
        Ok(self.ok)
    }

    /// (if cond then else) — no single-armed form.
    fn eval_if(&mut self, expr: Value, env: Value) -> SexprResult<Value> {
        let items = self.form_items(expr, "if")?;
        if items.len() != 4 {
            return Err(SexprError::MalformedForm(
                "if expects a condition and two branches".to_string(),
            ));
        }
        let cond = self.eval(items[1], env)?;
        if cond == self.falsehood {
            self.eval(items[3], env)
        } else {
            self.eval(items[2], env)
        }
    }

    /// (begin e1 ... en) — left to right, value of the last. An empty body
    /// is malformed.
    fn eval_begin(&mut self, expr: Value, env: Value) -> SexprResult<Value> {
        let items = self.form_items(expr, "begin")?;
        if items.len() < 2 {
            return Err(SexprError::MalformedForm(
                "begin expects at least one expression".to_string(),
            ));
        }
        let mut result = Value::Nil;
        for &item in &items[1..] {
            result = self.eval(item, env)?;
        }
        Ok(result)
    }

    /// (op arg...) — evaluate the operator, then arguments left to right,
    /// propagating the first failure, then apply.
    fn eval_application(&mut self, expr: Value, env: Value) -> SexprResult<Value> {
        let items = self.form_items(expr, "application")?;
        let op = self.eval(items[0], env)?;
        let mut argv = Vec::with_capacity(items.len() - 1);
        for &item in &items[1..] {
            argv.push(self.eval(item, env)?);
        }
        let args = self.arena.list(&argv)?;
        self.apply(op, args)
    }

    /// Apply a primitive or a (proc params body env) procedure to an
    /// already-evaluated argument list.
    pub fn apply(&mut self, op: Value, args: Value) -> SexprResult<Value> {
        match op {
            Value::Primitive(prim) => primitives::call_primitive(prim, args, self),
            Value::Pair(_) if is_proc(op, &self.arena) => {
                let items = match self.arena.list_to_vec(op) {
                    Some(items) if items.len() == 4 => items,
                    _ => {
                        return Err(SexprError::NotApplicable(
                            "malformed procedure value".to_string(),
                        ))
                    }
                };
                let (params, body, captured) = (items[1], items[2], items[3]);
                let frame = env::extend(params, args, captured, &mut self.arena)?;
                self.eval(body, frame)
            }
            _ => Err(SexprError::NotApplicable(
                "operator is neither a primitive nor a procedure".to_string(),
            )),
        }
    }

    // ========================================================================
    // Top-level driving and the sticky error slot
    // ========================================================================

    /// Evaluate one top-level form against the global environment. On
    /// failure the first error of the pass is remembered for the driver.
    pub fn eval_top(&mut self, expr: Value) -> Option<Value> {
        match self.eval(expr, self.globe) {
            Ok(val) => Some(val),
            Err(e) => {
                if self.last_error.is_none() {
                    self.last_error = Some(e);
                }
                None
            }
        }
    }

    /// Read and clear the sticky error slot.
    pub fn take_error(&mut self) -> Option<SexprError> {
        self.last_error.take()
    }

    /// Parse and evaluate every form in `src` against the global
    /// environment; the value of the last form. Empty input yields Nil.
    pub fn eval_str(&mut self, src: &str) -> SexprResult<Value> {
        let mut result = Value::Nil;
        let mut pos = 0;
        while let Some((expr, new_pos)) = reader::read_one_at(src, pos, &mut self.arena)? {
            pos = new_pos;
            result = self.eval(expr, self.globe)?;
        }
        Ok(result)
    }

    // ========================================================================
    // Collection
    // ========================================================================

    /// Mark from the roots, sweep, compact, and rewrite the roots through
    /// the forwarding table. Only safe between top-level forms: values held
    /// on the native stack are invisible to the collector.
    pub fn collect(&mut self) -> usize {
        self.arena.clear_marks();
        let mut worklist = Vec::new();
        self.arena.mark_value(self.globe, &mut worklist);
        self.arena.mark_value(self.ok, &mut worklist);
        self.arena.mark_value(self.truth, &mut worklist);
        self.arena.mark_value(self.falsehood, &mut worklist);
        self.arena.process_worklist(&mut worklist);

        let freed = self.arena.sweep();
        let forwarding = self.arena.compact();
        self.globe = forwarding.redirect(self.globe);
        self.ok = forwarding.redirect(self.ok);
        self.truth = forwarding.redirect(self.truth);
        self.falsehood = forwarding.redirect(self.falsehood);
        freed
    }
}

/// All chars decimal digits: the self-evaluating numeral shape.
pub fn is_numeral(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// A non-numeral atom — something an environment can bind.
fn is_symbol(val: Value, arena: &Arena) -> bool {
    match val.as_atom() {
        Some(id) => !is_numeral(arena.atom_text(id)),
        None => false,
    }
}

/// A pair chain tagged with the atom "proc".
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
    use crate::printer::print_val;

    fn eval_text(interp: &mut Interp, src: &str) -> String {
        let val = interp.eval_str(src).unwrap();
        print_val(val, &interp.arena)
    }

    #[test]
    fn numerals_self_evaluate() {
        let mut interp = Interp::new(1024).unwrap();
        assert_eq!(eval_text(&mut interp, "5"), "5");
        assert_eq!(eval_text(&mut interp, "()"), "()");
    }

    #[test]
    fn unbound_symbols_error() {
        let mut interp = Interp::new(1024).unwrap();
        assert_eq!(
            interp.eval_str("nonesuch"),
            Err(SexprError::Unbound("nonesuch".to_string()))
        );
    }

    #[test]
    fn quote_returns_unevaluated() {
        let mut interp = Interp::new(1024).unwrap();
        assert_eq!(eval_text(&mut interp, "(quote (1 2))"), "(1.(2.()))");
        assert_eq!(eval_text(&mut interp, "'(1 2)"), "(1.(2.()))");
        assert!(matches!(
            interp.eval_str("(quote a b)"),
            Err(SexprError::MalformedForm(_))
        ));
    }

    #[test]
    fn define_set_and_lookup() {
        let mut interp = Interp::new(1024).unwrap();
        assert_eq!(eval_text(&mut interp, "(define x 5)"), "ok");
        assert_eq!(eval_text(&mut interp, "(set! x (+ x 1))"), "ok");
        assert_eq!(eval_text(&mut interp, "x"), "6");
    }

    #[test]
    fn set_of_unbound_name_errors() {
        let mut interp = Interp::new(1024).unwrap();
        assert_eq!(
            interp.eval_str("(set! y 1)"),
            Err(SexprError::Unbound("y".to_string()))
        );
    }

    #[test]
    fn lambdas_close_over_their_environment() {
        let mut interp = Interp::new(1024).unwrap();
        interp
            .eval_str("(define make-adder (lambda (n) (lambda (m) (+ n m))))")
            .unwrap();
        interp.eval_str("(define add3 (make-adder 3))").unwrap();
        assert_eq!(eval_text(&mut interp, "(add3 4)"), "7");
    }

    #[test]
    fn application_arity_is_checked() {
        let mut interp = Interp::new(1024).unwrap();
        match interp.eval_str("((lambda (x y) x) 1)") {
            Err(SexprError::Arity { expected, got, .. }) => {
                assert_eq!((expected, got), (2, 1));
            }
            other => panic!("expected arity error, got {other:?}"),
        }
    }

    #[test]
    fn if_tests_the_false_sentinel_by_identity() {
        let mut interp = Interp::new(1024).unwrap();
        assert_eq!(eval_text(&mut interp, "(if (< 1 2) 'yes 'no)"), "yes");
        assert_eq!(eval_text(&mut interp, "(if (< 2 1) 'yes 'no)"), "no");
        // Nil and 0 are not the false sentinel.
        assert_eq!(eval_text(&mut interp, "(if () 'yes 'no)"), "yes");
        assert_eq!(eval_text(&mut interp, "(if 0 'yes 'no)"), "yes");
        assert!(matches!(
            interp.eval_str("(if #t 1)"),
            Err(SexprError::MalformedForm(_))
        ));
    }

    #[test]
    fn begin_sequences_and_propagates_failure() {
        let mut interp = Interp::new(1024).unwrap();
        assert_eq!(
            eval_text(&mut interp, "(begin (define x 1) (set! x 2) x)"),
            "2"
        );
        assert!(matches!(
            interp.eval_str("(begin)"),
            Err(SexprError::MalformedForm(_))
        ));
        // The failing middle expression stops evaluation.
        interp.eval_str("(define y 1)").unwrap();
        assert!(interp.eval_str("(begin (set! y 2) missing (set! y 3))").is_err());
        assert_eq!(eval_text(&mut interp, "y"), "2");
    }

    #[test]
    fn applying_a_non_procedure_errors() {
        let mut interp = Interp::new(1024).unwrap();
        assert!(matches!(
            interp.eval_str("(1 2 3)"),
            Err(SexprError::NotApplicable(_))
        ));
    }

    #[test]
    fn first_error_wins_in_the_sticky_slot() {
        let mut interp = Interp::new(1024).unwrap();
        let expr = reader::read_str("(first-missing second-missing)", &mut interp.arena).unwrap();
        assert!(interp.eval_top(expr).is_none());
        // Operator evaluation fails before any argument is reached.
        assert_eq!(
            interp.take_error(),
            Some(SexprError::Unbound("first-missing".to_string()))
        );
        assert_eq!(interp.take_error(), None);
    }

    #[test]
    fn collection_preserves_reachable_state() {
        let mut interp = Interp::new(4096).unwrap();
        interp
            .eval_str("(define lst (cons 1 (cons 2 ())))")
            .unwrap();
        interp.eval_str("(define inc (lambda (n) (+ n 1)))").unwrap();
        // Make some garbage, then collect.
        interp.eval_str("(+ 1 (+ 2 (+ 3 4)))").unwrap();
        let before = interp.arena.len();
        let freed = interp.collect();
        assert!(freed > 0);
        assert!(interp.arena.len() < before);

        assert_eq!(eval_text(&mut interp, "lst"), "(1.(2.()))");
        assert_eq!(eval_text(&mut interp, "(inc 41)"), "42");
    }

    #[test]
    fn collection_reclaims_dropped_closures_and_cycles() {
        let mut interp = Interp::new(4096).unwrap();
        interp.eval_str("(define keep (cons 1 2))").unwrap();

        // A self-referential pair bound, then rebound away.
        interp.eval_str("(define c (cons 1 2))").unwrap();
        interp.eval_str("(set-car! c c)").unwrap();
        interp.collect();
        let with_cycle = interp.arena.len();

        interp.eval_str("(define c 0)").unwrap();
        let freed = interp.collect();
        // The cycle pair and its cdr atom go; only the small "0" atom stays.
        assert!(freed >= 2);
        assert!(interp.arena.len() < with_cycle);
        assert_eq!(eval_text(&mut interp, "keep"), "(1.2)");
    }

    #[test]
    fn arena_exhaustion_surfaces_as_allocation_failure() {
        let mut interp = Interp::new(80).unwrap();
        let mut saw_full = false;
        for _ in 0..100 {
            match interp.eval_str("(cons 1 2)") {
                Ok(_) => {}
                Err(SexprError::ArenaFull) => {
                    saw_full = true;
                    break;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(saw_full);
        // Collection makes room again.
        interp.collect();
        assert!(interp.eval_str("(cons 1 2)").is_ok());
    }

    #[test]
    fn reset_gives_a_fresh_instance() {
        let mut interp = Interp::new(1024).unwrap();
        interp.eval_str("(define x 1)").unwrap();
        interp.reset().unwrap();
        assert!(matches!(
            interp.eval_str("x"),
            Err(SexprError::Unbound(_))
        ));
        assert_eq!(eval_text(&mut interp, "(+ 1 2)"), "3");
    }
}
