use crate::models::UserAccount;

/// Accounts listed in a passwd(5) file
pub fn parse_passwd(content: &str, captured_at: &str) -> Vec<UserAccount> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(':').collect();
            if fields.len() < 7 {
                return None;
            }
            // GECOS: full name first, then office and phone fields
            let full_name = fields[4].split(',').next().unwrap_or_default();
            Some(UserAccount {
                username: fields[0].to_string(),
                uid: fields[2].to_string(),
                gid: fields[3].to_string(),
                full_name: full_name.to_string(),
                home_dir: fields[5].to_string(),
                shell: fields[6].to_string(),
                captured_at: captured_at.to_string(),
            })
        })
        .collect()
}
