//! Operation lifecycle macros
//!
//! Every repository and migration operation emits a `start` event, then
//! either `end` or `end_error`. All three share [`__log_op!`] so the
//! `component`, `op` and `event` fields are always present and spelled the
//! same way. Paths resolve through this crate, so callers need neither
//! `tracing` nor `wallaby-core-types` in scope.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_op {
    ($level:expr, $event:expr, $op:expr $(, $($field:tt)*)?) => {
        $crate::logging_facility::__tracing::event!(
            $level,
            component = module_path!(),
            op = $op,
            event = $event,
            $($($field)*)?
        )
    };
}

/// `start` event for `op`, at INFO.
///
/// ```
/// # use wallaby_core::log_op_start;
/// log_op_start!("repo_save");
/// log_op_start!("repo_save", table = "books");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__log_op!(
            $crate::logging_facility::__tracing::Level::INFO,
            $crate::logging_facility::__fields::EVENT_START,
            $op
            $(, $($field)*)?
        )
    };
}

/// `end` event for `op`, at INFO. `duration_ms` is mandatory.
///
/// ```
/// # use wallaby_core::log_op_end;
/// log_op_end!("repo_save", duration_ms = 3, row_id = 12);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__log_op!(
            $crate::logging_facility::__tracing::Level::INFO,
            $crate::logging_facility::__fields::EVENT_END,
            $op,
            duration_ms = $duration
            $(, $($field)*)?
        )
    };
}

/// `end_error` event for `op`, at ERROR.
///
/// `$err` is anything convertible into `ExError`; its kind and stable code
/// are attached as `err.kind` and `err.code`. The error is consumed, so pass
/// a clone when the caller still returns it.
///
/// ```ignore
/// log_op_error!("repo_delete", err.clone(), duration_ms = 1, table = "run");
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let failure: $crate::errors::ExError = $err.into();
        $crate::__log_op!(
            $crate::logging_facility::__tracing::Level::ERROR,
            $crate::logging_facility::__fields::EVENT_END_ERROR,
            $op,
            duration_ms = $duration,
            err.kind = ?failure.kind(),
            err.code = failure.code()
            $(, $($field)*)?
        )
    }};
}
