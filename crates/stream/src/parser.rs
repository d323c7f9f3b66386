use crate::node::Node;
use crate::scan::{self, Scanner};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Scan(#[from] scan::Error),
    #[error(transparent)]
    Node(#[from] crate::node::Error),
    #[error("the parser completed or previously failed, and accepts no further input")]
    Unusable,
}

/// Parser drives scanner observations onto a streaming node tree.
/// Callbacks registered on the tree fire synchronously on the stack of
/// `push` and `complete`; errors they raise are never swallowed, and a
/// parser which has raised an error refuses further use.
pub struct Parser {
    scanner: Scanner,
    root: Node,
    last: Option<serde_json::Value>,
    completed: bool,
    poisoned: bool,
}

impl Parser {
    pub fn new(root: Node) -> Parser {
        Parser {
            scanner: Scanner::new(),
            root,
            last: None,
            completed: false,
            poisoned: false,
        }
    }

    /// Feed the next chunk of the document. An empty chunk is a no-op.
    pub fn push(&mut self, chunk: &str) -> Result<(), Error> {
        if chunk.is_empty() {
            return Ok(());
        }
        if self.poisoned || self.completed {
            return Err(Error::Unusable);
        }
        match self.push_inner(chunk) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.poisoned = true;
                Err(err)
            }
        }
    }

    fn push_inner(&mut self, chunk: &str) -> Result<(), Error> {
        let Some(observation) = self.scanner.push(chunk)? else {
            return Ok(());
        };
        // Chunks which only extend whitespace or a withheld token change
        // nothing; route only observations which differ.
        if self.last.as_ref() == Some(&observation.value) {
            return Ok(());
        }
        tracing::trace!(status = ?observation.status, "routing observation");
        self.root.update(&observation.value)?;
        self.last = Some(observation.value);
        Ok(())
    }

    /// Signal end of input, completing the node tree. Idempotent: a
    /// second call is a silent no-op.
    pub fn complete(&mut self) -> Result<(), Error> {
        if self.completed {
            return Ok(());
        }
        if self.poisoned {
            return Err(Error::Unusable);
        }
        match self.complete_inner() {
            Ok(()) => {
                self.completed = true;
                Ok(())
            }
            Err(err) => {
                self.poisoned = true;
                Err(err)
            }
        }
    }

    fn complete_inner(&mut self) -> Result<(), Error> {
        if let Some(observation) = self.scanner.finish()? {
            if self.last.as_ref() != Some(&observation.value) {
                self.root.update(&observation.value)?;
                self.last = Some(observation.value);
            }
        }
        self.root.complete()?;
        Ok(())
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn into_root(self) -> Node {
        self.root
    }

    /// Run `f` against a parser over `root`, driving `complete` on exit.
    /// If `f` fails, completion is still attempted and the original error
    /// is returned.
    pub fn scoped<T, E, F>(root: Node, f: F) -> Result<(Node, T), E>
    where
        E: From<Error>,
        F: FnOnce(&mut Parser) -> Result<T, E>,
    {
        let mut parser = Parser::new(root);
        match f(&mut parser) {
            Ok(t) => {
                parser.complete()?;
                Ok((parser.into_root(), t))
            }
            Err(err) => {
                let _ = parser.complete();
                Err(err)
            }
        }
    }
}
