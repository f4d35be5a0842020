use crate::utils::legalize_name;

/// Prefix shared by every sandbox id
pub const SANDBOX_PREFIX: &str = "test";

/// Identifier of the sandbox for one module execution.
///
/// Embeds the legalized tested directory, the module name and the process
/// id so concurrent runs on one host never share a sandbox.
pub fn sandbox_id(tested_dir: &str, module_name: &str, pid: u32) -> String {
    format!(
        "{SANDBOX_PREFIX}_{}_{}_{pid}",
        legalize_name(tested_dir),
        legalize_name(module_name)
    )
}
