//! Caching of per-library symbol tables.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::rc::Rc;

use crate::log::debug;
use crate::log::warn;
use crate::source::LibSym;
use crate::source::SymbolSource;
use crate::Addr;


/// The symbols exported by one library, keyed by offset.
///
/// Tables are immutable once built: a missing offset is simply not
/// covered, it is never reason to rebuild.
#[derive(Debug)]
pub(crate) struct SymbolTable {
    /// The symbols, sorted by address.
    syms: Box<[LibSym]>,
}

impl SymbolTable {
    fn new(mut syms: Vec<LibSym>) -> Self {
        let () = syms.sort_by(|sym1, sym2| {
            sym1.addr
                .cmp(&sym2.addr)
                .then_with(|| sym1.name.cmp(&sym2.name))
        });
        Self {
            syms: syms.into_boxed_slice(),
        }
    }

    /// Look up the symbol at exactly `offset`.
    ///
    /// Lookups are exact: an offset in the interior of a symbol is
    /// not covered by the table.
    pub fn find(&self, offset: Addr) -> Option<&str> {
        self.syms
            .binary_search_by_key(&offset, |sym| sym.addr)
            .ok()
            .map(|idx| &*self.syms[idx].name)
    }

    /// The number of symbols in the table.
    pub fn len(&self) -> usize {
        self.syms.len()
    }
}


/// A cache of [`SymbolTable`] objects, keyed by library path.
///
/// A table is built at most once per path and session, by consulting
/// the provided [`SymbolSource`] on first reference. Enumeration
/// failure degrades to an empty table, which is cached all the same:
/// the source is never consulted twice for the same path.
#[derive(Debug)]
pub(crate) struct LibCache {
    /// The tables built so far.
    tables: RefCell<HashMap<PathBuf, Rc<SymbolTable>>>,
}

impl LibCache {
    /// Create a new, empty `LibCache`.
    pub fn new() -> Self {
        Self {
            tables: RefCell::new(HashMap::new()),
        }
    }

    /// Retrieve the symbol table for the library at `path`, building
    /// it by way of `source` on first reference.
    pub fn table<S>(&self, path: &Path, source: &S) -> Rc<SymbolTable>
    where
        S: SymbolSource,
    {
        if let Some(table) = self.tables.borrow().get(path) {
            return Rc::clone(table)
        }

        let syms = match source.symbols(path) {
            Ok(syms) => syms,
            Err(err) => {
                // Unresolvable libraries (stripped or simply absent on
                // the symbolizing host) are an expected condition, not
                // a reason to disturb the stream.
                let () = warn!(
                    "failed to enumerate symbols of {}: {err}",
                    path.display()
                );
                Vec::new()
            }
        };
        let table = Rc::new(SymbolTable::new(syms));
        let () = debug!(
            "built symbol table for {} ({} symbols)",
            path.display(),
            table.len()
        );
        let _prev = self
            .tables
            .borrow_mut()
            .insert(path.to_path_buf(), Rc::clone(&table));
        table
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    use test_log::test;

    use crate::Error;
    use crate::Result;


    /// A `SymbolSource` handing out canned listings while counting
    /// invocations.
    struct Canned {
        syms: Vec<LibSym>,
        fail: bool,
        invocations: Cell<usize>,
    }

    impl Canned {
        fn new(syms: Vec<LibSym>) -> Self {
            Self {
                syms,
                fail: false,
                invocations: Cell::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(Vec::new())
            }
        }
    }

    impl SymbolSource for Canned {
        fn symbols(&self, _path: &Path) -> Result<Vec<LibSym>> {
            let () = self.invocations.set(self.invocations.get() + 1);
            if self.fail {
                Err(Error::with_invalid_data("no symbols to be had"))
            } else {
                Ok(self.syms.clone())
            }
        }
    }

    /// Check that lookups are exact and unsorted input is handled.
    #[test]
    fn exact_lookup() {
        let source = Canned::new(vec![
            LibSym::new(0x254, "A::Bar(char const*)"),
            LibSym::new(0x234, "A::Foo(int)"),
        ]);
        let cache = LibCache::new();
        let table = cache.table(Path::new("/lib/liba.so"), &source);

        assert_eq!(table.find(0x234), Some("A::Foo(int)"));
        assert_eq!(table.find(0x254), Some("A::Bar(char const*)"));
        // No nearest-preceding matching.
        assert_eq!(table.find(0x235), None);
        assert_eq!(table.find(0x0), None);
        assert_eq!(table.find(0x1000), None);
    }

    /// Check that the source is consulted at most once per path.
    #[test]
    fn single_enumeration() {
        let source = Canned::new(vec![LibSym::new(0x10, "frob()")]);
        let cache = LibCache::new();

        let liba = Path::new("/lib/liba.so");
        let libb = Path::new("/lib/libb.so");
        let _table = cache.table(liba, &source);
        let _table = cache.table(liba, &source);
        let table = cache.table(liba, &source);
        assert_eq!(source.invocations.get(), 1);
        assert_eq!(table.find(0x10), Some("frob()"));

        let _table = cache.table(libb, &source);
        assert_eq!(source.invocations.get(), 2);
    }

    /// Check that enumeration failure is cached as an empty table and
    /// never retried.
    #[test]
    fn failure_not_retried() {
        let source = Canned::failing();
        let cache = LibCache::new();

        let path = Path::new("/lib/libunknown.so");
        let table = cache.table(path, &source);
        assert_eq!(table.len(), 0);
        assert_eq!(table.find(0x254), None);

        let table = cache.table(path, &source);
        assert_eq!(table.find(0x254), None);
        assert_eq!(source.invocations.get(), 1);
    }
}
