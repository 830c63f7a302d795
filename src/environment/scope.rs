use rustc_hash::FxHashMap;

use super::error::NameError;

/// Bindings introduced by one lexical block.
#[derive(Debug)]
pub struct Frame<V, F> {
    variables: FxHashMap<String, V>,
    functions: FxHashMap<(String, usize), F>,
}

impl<V, F> Default for Frame<V, F> {
    fn default() -> Self {
        Self {
            variables: FxHashMap::default(),
            functions: FxHashMap::default(),
        }
    }
}

/// The live chain of scopes from the root to the innermost block.
///
/// `V` is what a variable name resolves to and `F` what a (name, arity) pair
/// resolves to: static bindings in the analyzer, runtime values and callables
/// in the interpreter. The root frame is never popped.
#[derive(Debug)]
pub struct ScopeChain<V, F> {
    frames: Vec<Frame<V, F>>,
}

impl<V, F> ScopeChain<V, F> {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self) {
        self.frames.push(Frame::default());
        tracing::trace!(depth = self.depth(), "push scope");
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
        tracing::trace!(depth = self.depth(), "pop scope");
    }

    /// Detaches every frame above the root so a call can run against a fresh
    /// chain. Hand the result back to `reattach` once the call returns.
    pub fn detach_to_root(&mut self) -> Vec<Frame<V, F>> {
        self.frames.split_off(1)
    }

    pub fn reattach(&mut self, frames: Vec<Frame<V, F>>) {
        self.frames.truncate(1);
        self.frames.extend(frames);
    }

    fn current(&mut self) -> &mut Frame<V, F> {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    pub fn define_variable(&mut self, name: &str, value: V) -> Result<(), NameError> {
        let frame = self.current();
        if frame.variables.contains_key(name) {
            return Err(NameError::AlreadyDefined {
                name: name.to_string(),
            });
        }
        frame.variables.insert(name.to_string(), value);
        Ok(())
    }

    pub fn define_function(&mut self, name: &str, arity: usize, function: F) -> Result<(), NameError> {
        let frame = self.current();
        let key = (name.to_string(), arity);
        if frame.functions.contains_key(&key) {
            return Err(NameError::AlreadyDefined {
                name: name.to_string(),
            });
        }
        frame.functions.insert(key, function);
        Ok(())
    }

    pub fn lookup_variable(&self, name: &str) -> Result<&V, NameError> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.variables.get(name))
            .ok_or_else(|| NameError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    pub fn lookup_variable_mut(&mut self, name: &str) -> Result<&mut V, NameError> {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.variables.get_mut(name))
            .ok_or_else(|| NameError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    pub fn lookup_function(&self, name: &str, arity: usize) -> Result<&F, NameError> {
        let key = (name.to_string(), arity);
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.functions.get(&key))
            .ok_or_else(|| NameError::UndefinedFunction {
                name: name.to_string(),
                arity,
            })
    }
}

impl<V, F> Default for ScopeChain<V, F> {
    fn default() -> Self {
        Self::new()
    }
}
