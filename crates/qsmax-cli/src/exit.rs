// Exit codes for precise CI triage
use qsmax_common::QsmaxError;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_GENERIC_FAIL: i32 = 1;
pub const EXIT_PARITY_FAIL: i32 = 5;
pub const EXIT_UNSUPPORTED: i32 = 6;

/// Map a command failure to its process exit code.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    let unsupported = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<QsmaxError>(),
            Some(QsmaxError::UnsupportedBackend { .. } | QsmaxError::UnsupportedExecMode(_))
        )
    });
    if unsupported {
        EXIT_UNSUPPORTED
    } else {
        EXIT_GENERIC_FAIL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn unsupported_backend_through_context() {
        let err: anyhow::Result<()> = Err(QsmaxError::UnsupportedBackend {
            kernel: "QuantSoftmax".into(),
            backend: "rtlsim".into(),
        })
        .context("executing node");
        assert_eq!(exit_code_for(&err.unwrap_err()), EXIT_UNSUPPORTED);
    }

    #[test]
    fn other_errors_are_generic() {
        assert_eq!(exit_code_for(&anyhow::anyhow!("boom")), EXIT_GENERIC_FAIL);
    }
}
