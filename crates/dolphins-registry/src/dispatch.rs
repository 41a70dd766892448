use std::fmt;
use std::str::FromStr;

use dolphins_ledger::{HistoryReader, StateStore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::manager::{DiverProfile, RecordManager};

/// Named operations accepted by [`RecordManager::invoke`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    AddDiver,
    AddLevel,
    AddCourse,
    AddTestResult,
    GetLevel,
    GetHistoryForKey,
}

/// Argument count an operation accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::AddDiver,
        Operation::AddLevel,
        Operation::AddCourse,
        Operation::AddTestResult,
        Operation::GetLevel,
        Operation::GetHistoryForKey,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::AddDiver => "addDiver",
            Self::AddLevel => "addLevel",
            Self::AddCourse => "addCourse",
            Self::AddTestResult => "addTestResult",
            Self::GetLevel => "getLevel",
            Self::GetHistoryForKey => "getHistoryForKey",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Self::AddDiver => Arity::Exactly(5),
            Self::AddLevel => Arity::Exactly(4),
            Self::AddCourse | Self::AddTestResult => Arity::Exactly(3),
            Self::GetLevel => Arity::Exactly(1),
            Self::GetHistoryForKey => Arity::AtLeast(1),
        }
    }

    /// `true` if the operation never writes to the state store.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::GetLevel | Self::GetHistoryForKey)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| RegistryError::UnsupportedOperation(s.to_string()))
    }
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Self::Exactly(n) => count == n,
            Self::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "exactly {n}"),
            Self::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// An operation name plus its ordered string arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    #[serde(rename = "fn")]
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, A>(function: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            function: function.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl RecordManager {
    /// Run a named operation against `ledger`.
    ///
    /// Checks the name and the argument count before touching the ledger.
    pub fn invoke<L>(&self, ledger: &L, function: &str, args: &[String]) -> RegistryResult<String>
    where
        L: StateStore + HistoryReader + ?Sized,
    {
        let operation: Operation = function.parse()?;
        let arity = operation.arity();
        if !arity.accepts(args.len()) {
            return Err(RegistryError::Argument {
                operation: operation.name(),
                expected: arity,
                actual: args.len(),
            });
        }

        debug!(operation = %operation, key = %args[0], "invoke");
        match operation {
            Operation::AddDiver => self.create_diver(
                ledger,
                DiverProfile {
                    id: args[0].clone(),
                    name: args[1].clone(),
                    birth_date: args[2].clone(),
                    gender: args[3].clone(),
                    diver_type: args[4].clone(),
                },
            ),
            Operation::AddLevel => self.add_level(ledger, &args[0], &args[1], &args[2], &args[3]),
            Operation::AddCourse => self.add_course(ledger, &args[0], &args[1], &args[2]),
            Operation::AddTestResult => self.add_test_result(ledger, &args[0], &args[1], &args[2]),
            Operation::GetLevel => self.get_level(ledger, &args[0]),
            Operation::GetHistoryForKey => self.get_history(ledger, &args[0]),
        }
    }

    pub fn invoke_with<L>(&self, ledger: &L, invocation: &Invocation) -> RegistryResult<String>
    where
        L: StateStore + HistoryReader + ?Sized,
    {
        self.invoke(ledger, &invocation.function, &invocation.args)
    }
}
