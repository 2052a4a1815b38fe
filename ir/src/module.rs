//! Modules: ordered function containers with symbol-table insertion.

use crate::func::Function;

/// An ordered list of functions with unique symbol names.
#[derive(Debug, Clone, Default)]
pub struct Module {
    functions: Vec<Function>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn func(&self, index: usize) -> &Function {
        &self.functions[index]
    }

    pub fn func_mut(&mut self, index: usize) -> &mut Function {
        &mut self.functions[index]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name() == name)
    }

    /// Append a function, renaming on symbol collision.
    pub fn add_function(&mut self, func: Function) -> (usize, String) {
        let index = self.functions.len();
        self.insert_function(index, func)
    }

    /// Insert a function at `index`, renaming on symbol collision by
    /// appending `_<n>`. Returns the final index and the (possibly renamed)
    /// symbol name.
    pub fn insert_function(&mut self, index: usize, mut func: Function) -> (usize, String) {
        if self.index_of(func.name()).is_some() {
            let base = func.name().to_string();
            let mut n = 0usize;
            loop {
                let candidate = format!("{base}_{n}");
                if self.index_of(&candidate).is_none() {
                    func.set_name(candidate);
                    break;
                }
                n += 1;
            }
        }
        let name = func.name().to_string();
        self.functions.insert(index, func);
        (index, name)
    }
}
