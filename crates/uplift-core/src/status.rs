//! Exit-status propagation.
//!
//! The exit status is the only signal that crosses a process boundary in
//! an elevated session: target → agent → coordinator → caller.

use std::process::ExitStatus;

/// Map a child's exit status onto the status this process should exit with.
///
/// Signal deaths map to the conventional `128 + signal`; a status carrying
/// neither a code nor a signal collapses to `1`.
pub fn propagated_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    status.code().unwrap_or(1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn plain_codes_pass_through() {
        use std::os::unix::process::ExitStatusExt;
        // wait(2) encoding: exit code in the high byte.
        assert_eq!(propagated_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(propagated_code(ExitStatus::from_raw(7 << 8)), 7);
        assert_eq!(propagated_code(ExitStatus::from_raw(255 << 8)), 255);
    }

    #[cfg(unix)]
    #[test]
    fn signal_deaths_map_to_128_plus_signal() {
        use std::os::unix::process::ExitStatusExt;
        // wait(2) encoding: terminating signal in the low byte.
        assert_eq!(propagated_code(ExitStatus::from_raw(15)), 143);
        assert_eq!(propagated_code(ExitStatus::from_raw(9)), 137);
    }
}
