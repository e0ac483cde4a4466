use std::io;

use rama::telemetry::tracing;

/// Raise the soft limit of open file descriptors towards `target`,
/// never beyond the hard limit and never lowering it.
///
/// Simulated requests keep their connection open for the full
/// duration of their behavior, so the default limit is easily hit.
pub fn raise_nofile(target: super::rlim_t) -> io::Result<()> {
    let mut limit = nofile_limit()?;

    let soft = limit.rlim_cur as super::rlim_t;
    let wanted = target.min(limit.rlim_max as super::rlim_t);
    if soft >= wanted {
        tracing::debug!(soft, wanted, "ulimit: open file limit already sufficient");
        return Ok(());
    }

    limit.rlim_cur = wanted as libc::rlim_t;
    // SAFETY: `limit` is a fully initialised rlimit obtained from getrlimit.
    if unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &limit) } != 0 {
        return Err(io::Error::last_os_error());
    }

    tracing::info!(previous = soft, current = wanted, "ulimit: raised open file limit");
    Ok(())
}

fn nofile_limit() -> io::Result<libc::rlimit> {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: getrlimit only writes into the provided, valid rlimit.
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(limit)
}
