use crate::error::{SexprError, SexprResult};
use crate::value::{CellId, Value};

/// Payload of one arena slot.
#[derive(Debug)]
pub enum Cell {
    /// Immutable atom text, owned by the cell.
    Atom(String),
    /// car and cdr.
    Pair(Value, Value),
    /// Reclaimed by sweep; removed from the table by compact.
    Free,
}

struct Slot {
    cell: Cell,
    mark: bool,
}

/// The bounded cell arena. All atoms and pairs are allocated here;
/// a CellId is an index into `slots`.
///
/// Allocation is a bump cursor with no free list: when the table reaches
/// capacity, `alloc` fails and it is the caller's job to collect (between
/// top-level forms) and retry, or to surface the failure.
pub struct Arena {
    slots: Vec<Slot>,
    capacity: usize,
}

/// Old-index to new-index table produced by `compact`. Roots held outside
/// the arena must be pushed through `redirect` after every collection.
pub struct Forwarding {
    map: Vec<Option<u32>>,
}

impl Forwarding {
    pub fn redirect(&self, val: Value) -> Value {
        match val {
            Value::Atom(id) => Value::Atom(self.new_id(id)),
            Value::Pair(id) => Value::Pair(self.new_id(id)),
            other => other,
        }
    }

    fn new_id(&self, id: CellId) -> CellId {
        match self.map[id.0 as usize] {
            Some(new) => CellId(new),
            // A surviving reference to a swept cell would be a collector bug:
            // mark runs before sweep precisely to rule this out.
            None => unreachable!("redirect of a swept cell"),
        }
    }
}

impl Arena {
    pub fn new(capacity: usize) -> Self {
        Arena {
            slots: Vec::new(),
            capacity,
        }
    }

    fn alloc(&mut self, cell: Cell) -> SexprResult<CellId> {
        if self.slots.len() >= self.capacity {
            return Err(SexprError::ArenaFull);
        }
        let id = CellId(self.slots.len() as u32);
        self.slots.push(Slot { cell, mark: false });
        Ok(id)
    }

    /// Allocate an atom cell copying `text`.
    pub fn alloc_atom(&mut self, text: &str) -> SexprResult<Value> {
        let id = self.alloc(Cell::Atom(text.to_string()))?;
        Ok(Value::Atom(id))
    }

    /// Allocate a pair cell.
    pub fn alloc_pair(&mut self, car: Value, cdr: Value) -> SexprResult<Value> {
        let id = self.alloc(Cell::Pair(car, cdr))?;
        Ok(Value::Pair(id))
    }

    /// Text of an atom cell.
    pub fn atom_text(&self, id: CellId) -> &str {
        match &self.slots[id.0 as usize].cell {
            Cell::Atom(text) => text,
            _ => unreachable!("atom_text of a non-atom cell"),
        }
    }

    #[inline]
    pub fn car(&self, id: CellId) -> Value {
        match &self.slots[id.0 as usize].cell {
            Cell::Pair(car, _) => *car,
            _ => unreachable!("car of a non-pair cell"),
        }
    }

    #[inline]
    pub fn cdr(&self, id: CellId) -> Value {
        match &self.slots[id.0 as usize].cell {
            Cell::Pair(_, cdr) => *cdr,
            _ => unreachable!("cdr of a non-pair cell"),
        }
    }

    pub fn set_car(&mut self, id: CellId, val: Value) {
        match &mut self.slots[id.0 as usize].cell {
            Cell::Pair(car, _) => *car = val,
            _ => unreachable!("set_car of a non-pair cell"),
        }
    }

    pub fn set_cdr(&mut self, id: CellId, val: Value) {
        match &mut self.slots[id.0 as usize].cell {
            Cell::Pair(_, cdr) => *cdr = val,
            _ => unreachable!("set_cdr of a non-pair cell"),
        }
    }

    /// Build a proper list from a slice of values.
    pub fn list(&mut self, values: &[Value]) -> SexprResult<Value> {
        let mut result = Value::Nil;
        for &val in values.iter().rev() {
            result = self.alloc_pair(val, result)?;
        }
        Ok(result)
    }

    /// Collect a proper list into a Vec. Returns None on a dotted tail.
    pub fn list_to_vec(&self, val: Value) -> Option<Vec<Value>> {
        let mut result = Vec::new();
        let mut current = val;
        loop {
            match current {
                Value::Nil => return Some(result),
                Value::Pair(id) => {
                    result.push(self.car(id));
                    current = self.cdr(id);
                }
                _ => return None,
            }
        }
    }

    /// Length of a proper list. None on a dotted tail.
    pub fn list_len(&self, val: Value) -> Option<usize> {
        let mut count = 0;
        let mut current = val;
        loop {
            match current {
                Value::Nil => return Some(count),
                Value::Pair(id) => {
                    count += 1;
                    current = self.cdr(id);
                }
                _ => return None,
            }
        }
    }

    /// Number of slots in use (including freed-but-uncompacted ones).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of non-free slots (accurate after a sweep).
    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| !matches!(s.cell, Cell::Free))
            .count()
    }

    // === Collector phases ===

    /// Reset all mark bits before a new trace.
    pub fn clear_marks(&mut self) {
        for slot in &mut self.slots {
            slot.mark = false;
        }
    }

    /// Mark a root. Atoms are leaves; pairs go on the worklist so their
    /// slots get traced. The mark bit check terminates cycles.
    pub fn mark_value(&mut self, val: Value, worklist: &mut Vec<CellId>) {
        match val {
            Value::Atom(id) => {
                self.slots[id.0 as usize].mark = true;
            }
            Value::Pair(id) => {
                if !self.slots[id.0 as usize].mark {
                    self.slots[id.0 as usize].mark = true;
                    worklist.push(id);
                }
            }
            Value::Nil | Value::Primitive(_) => {}
        }
    }

    /// Trace the worklist to fixpoint: each marked pair marks its car and cdr.
    pub fn process_worklist(&mut self, worklist: &mut Vec<CellId>) {
        while let Some(id) = worklist.pop() {
            let (car, cdr) = match &self.slots[id.0 as usize].cell {
                Cell::Pair(car, cdr) => (*car, *cdr),
                _ => unreachable!("worklist entry is not a pair"),
            };
            self.mark_value(car, worklist);
            self.mark_value(cdr, worklist);
        }
    }

    /// Reclaim every unmarked cell, dropping its payload. Returns the
    /// number of cells freed.
    pub fn sweep(&mut self) -> usize {
        let mut freed = 0;
        for slot in &mut self.slots {
            if slot.mark {
                slot.mark = false;
            } else if !matches!(slot.cell, Cell::Free) {
                slot.cell = Cell::Free;
                freed += 1;
            }
        }
        freed
    }

    /// Remove freed slots and renumber the survivors densely. Every
    /// surviving pair slot is rewritten through the forwarding table;
    /// the caller must do the same for its roots.
    pub fn compact(&mut self) -> Forwarding {
        let mut map = vec![None; self.slots.len()];
        let mut next = 0u32;
        for (i, slot) in self.slots.iter().enumerate() {
            if !matches!(slot.cell, Cell::Free) {
                map[i] = Some(next);
                next += 1;
            }
        }

        let old = std::mem::take(&mut self.slots);
        self.slots.reserve(next as usize);
        for (i, slot) in old.into_iter().enumerate() {
            if map[i].is_some() {
                self.slots.push(slot);
            }
        }

        let forwarding = Forwarding { map };
        for slot in &mut self.slots {
            if let Cell::Pair(car, cdr) = &mut slot.cell {
                *car = forwarding.redirect(*car);
                *cdr = forwarding.redirect(*cdr);
            }
        }
        forwarding
    }
}
