//! Call counting and call history for cache operations.
//!
//! An [`Operation`] is a named piece of work bound to some receiver. The
//! decorators here wrap an operation without changing what it returns:
//!
//! - [`CountCalls`] increments the counter `<name>` before the operation runs.
//! - [`RecordHistory`] appends the argument tuple to `<name>:inputs` and the
//!   result to `<name>:outputs` after the operation returns.
//!
//! Both reach the store through the receiver's [`Instrumentable`]
//! capability. A receiver without a store handle is simply not recorded.
//!
//! ## Ordering
//!
//! A call counted by `CountCalls` stays counted even if the operation then
//! fails. `RecordHistory` renders both sides before appending either, so a
//! rendering failure appends nothing; a store failure between the two
//! appends can still leave the inputs log one entry longer.

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

use callcache_store::KeyValueStore;

use crate::error::Result;
use crate::repr::{CallArgs, LogOutput};

/// Qualified name of an instrumented operation, e.g. `Cache.store`.
///
/// The name is also the store key layout: the counter lives at the name
/// itself, the histories at `<name>:inputs` and `<name>:outputs`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OperationName(Cow<'static, str>);

impl OperationName {
    /// Name from a static string.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Name from an owned string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of the call counter.
    pub fn counter_key(&self) -> &str {
        &self.0
    }

    /// Key of the inputs log.
    pub fn inputs_key(&self) -> String {
        format!("{}:inputs", self.0)
    }

    /// Key of the outputs log.
    pub fn outputs_key(&self) -> String {
        format!("{}:outputs", self.0)
    }
}

impl fmt::Debug for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperationName({})", self.0)
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for OperationName {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

/// Capability to record instrumentation for calls made on `self`.
///
/// Implementors only have to expose their store handle. Returning `None`
/// turns counting and history into no-ops for that receiver.
pub trait Instrumentable {
    /// Store that receives counters and histories.
    fn instrumentation_store(&self) -> Option<&dyn KeyValueStore>;

    /// Increment the call counter for `name`.
    ///
    /// Returns `false` when the receiver has no store handle.
    fn record_call(&self, name: &OperationName) -> Result<bool> {
        let Some(store) = self.instrumentation_store() else {
            tracing::debug!(operation = %name, "no store handle, call not counted");
            return Ok(false);
        };

        let count = store.incr(name.counter_key())?;
        tracing::trace!(operation = %name, count, "counted call");
        Ok(true)
    }

    /// Append one rendered call to the history logs for `name`.
    ///
    /// Inputs are appended before outputs. Returns `false` when the
    /// receiver has no store handle.
    fn append_history(&self, name: &OperationName, inputs: &str, output: &[u8]) -> Result<bool> {
        let Some(store) = self.instrumentation_store() else {
            tracing::debug!(operation = %name, "no store handle, history not recorded");
            return Ok(false);
        };

        let position = store.append(&name.inputs_key(), inputs.as_bytes())?;
        store.append(&name.outputs_key(), output)?;
        tracing::trace!(operation = %name, position, "recorded call history");
        Ok(true)
    }
}

/// A named operation invoked on a receiver of type `T`.
pub trait Operation<T: ?Sized> {
    /// Positional arguments.
    type Args;
    /// Successful result.
    type Output;

    fn name(&self) -> &OperationName;

    fn call(&self, target: &T, args: &Self::Args) -> Result<Self::Output>;
}

/// Operation backed by a closure.
pub struct FnOperation<F, A, R> {
    name: OperationName,
    f: F,
    _marker: PhantomData<fn(&A) -> R>,
}

impl<F, A, R> FnOperation<F, A, R> {
    pub fn new<T>(name: impl Into<OperationName>, f: F) -> Self
    where
        T: ?Sized,
        F: Fn(&T, &A) -> Result<R>,
    {
        Self {
            name: name.into(),
            f,
            _marker: PhantomData,
        }
    }
}

impl<T, F, A, R> Operation<T> for FnOperation<F, A, R>
where
    T: ?Sized,
    F: Fn(&T, &A) -> Result<R>,
{
    type Args = A;
    type Output = R;

    fn name(&self) -> &OperationName {
        &self.name
    }

    fn call(&self, target: &T, args: &A) -> Result<R> {
        (self.f)(target, args)
    }
}

/// Counts every call before delegating to the wrapped operation.
#[derive(Debug, Clone)]
pub struct CountCalls<O> {
    inner: O,
}

impl<O> CountCalls<O> {
    pub const fn new(inner: O) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

impl<T, O> Operation<T> for CountCalls<O>
where
    T: Instrumentable + ?Sized,
    O: Operation<T>,
{
    type Args = O::Args;
    type Output = O::Output;

    fn name(&self) -> &OperationName {
        self.inner.name()
    }

    fn call(&self, target: &T, args: &Self::Args) -> Result<Self::Output> {
        // Counted on attempt: no rollback if the operation fails below.
        target.record_call(self.inner.name())?;
        self.inner.call(target, args)
    }
}

/// Records the arguments and result of every successful call.
#[derive(Debug, Clone)]
pub struct RecordHistory<O> {
    inner: O,
}

impl<O> RecordHistory<O> {
    pub const fn new(inner: O) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

impl<T, O> Operation<T> for RecordHistory<O>
where
    T: Instrumentable + ?Sized,
    O: Operation<T>,
    O::Args: CallArgs,
    O::Output: LogOutput,
{
    type Args = O::Args;
    type Output = O::Output;

    fn name(&self) -> &OperationName {
        self.inner.name()
    }

    fn call(&self, target: &T, args: &Self::Args) -> Result<Self::Output> {
        let output = self.inner.call(target, args)?;

        if target.instrumentation_store().is_none() {
            tracing::debug!(operation = %self.inner.name(), "no store handle, history not recorded");
            return Ok(output);
        }

        let rendered = args
            .render_args()
            .and_then(|inputs| output.log_output().map(|out| (inputs, out)));
        let (inputs, out) = match rendered {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(operation = %self.inner.name(), error = %e, "failed to render call history");
                return Err(e.into());
            }
        };

        target.append_history(self.inner.name(), &inputs, &out)?;
        Ok(output)
    }
}

/// Counting outermost, history innermost.
pub type Instrumented<O> = CountCalls<RecordHistory<O>>;

/// Wrap `op` with both counting and history.
pub const fn instrument<O>(op: O) -> Instrumented<O> {
    CountCalls::new(RecordHistory::new(op))
}
