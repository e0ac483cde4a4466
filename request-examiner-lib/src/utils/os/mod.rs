#[cfg(target_family = "unix")]
mod unix;

#[cfg(target_family = "unix")]
pub use self::unix::raise_nofile;

#[cfg(target_family = "unix")]
#[allow(non_camel_case_types)]
pub type rlim_t = u64;
