use winapi::um::shellapi::IsUserAnAdmin;

/// Member of the Administrators group with an elevated token
pub fn is_admin() -> bool {
    // SAFETY: IsUserAnAdmin takes no arguments and only reads the process token
    unsafe { IsUserAnAdmin() != 0 }
}
