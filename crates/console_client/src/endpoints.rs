//! The fixed REST surface of the remote console API. Paths are joined onto
//! the host root the client was built with.

pub const ROOT_API: &str = "/MAAS/api/2.0/";
pub const LOGIN_API: &str = "/MAAS/accounts/login/";
pub const LOGOUT_API: &str = "/MAAS/accounts/logout/";
pub const EXTERNAL_LOGIN_API: &str = "/MAAS/accounts/discharge-request/";

pub fn scripts() -> String {
    format!("{ROOT_API}scripts/")
}

pub fn script(name: &str) -> String {
    format!("{ROOT_API}scripts/{name}")
}

pub fn license_keys() -> String {
    format!("{ROOT_API}license-keys/")
}

pub fn license_key(osystem: &str, distro_series: &str) -> String {
    format!("{ROOT_API}license-key/{osystem}/{distro_series}")
}

pub fn machines() -> String {
    format!("{ROOT_API}machines/")
}

pub fn script_results(system_id: &str, script_set_id: &str) -> String {
    format!("{ROOT_API}nodes/{system_id}/results/{script_set_id}/")
}
