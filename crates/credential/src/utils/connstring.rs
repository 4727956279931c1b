//! Connection-string rewriting
//!
//! Connection strings are `key=value` pairs separated by `;`. A value may be
//! wrapped in `"` or `'` (a doubled quote inside stands for one), in which
//! case `;` inside it does not end the entry. Only the password entry is
//! touched; every other entry keeps its text and position.

use secrecy::{ExposeSecret, SecretString};

/// Keys that carry the password, compared case-insensitively
const PASSWORD_KEYS: [&str; 2] = ["password", "pwd"];

/// Inputs for building a connection string when the target has none yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTemplate {
    /// Data-service host, e.g. `mydb.database.windows.net`
    pub host: String,
    /// Initial catalog, when the provider address names one
    pub database: Option<String>,
    /// Login name
    pub login: String,
}

impl ConnectionTemplate {
    /// Render a connection string for `password`
    pub fn render(&self, password: &SecretString) -> SecretString {
        let mut out = format!("Server=tcp:{},1433;", self.host);
        if let Some(database) = &self.database {
            out.push_str(&format!("Initial Catalog={database};"));
        }
        out.push_str(&format!(
            "User ID={};Password={};Encrypt=True;",
            self.login,
            quote_value(password.expose_secret())
        ));
        SecretString::from(out)
    }
}

/// Replace the password inside a connection string
///
/// Every `Password=` / `Pwd=` entry gets the new value. When no such entry
/// exists, `Password={new}` is appended.
///
/// # Examples
///
/// ```
/// use keyturn_credential::utils::replace_password;
/// use secrecy::{ExposeSecret, SecretString};
///
/// let current = SecretString::from("Server=db;User ID=app;pwd=old;");
/// let updated = replace_password(&current, &SecretString::from("new"));
/// assert_eq!(updated.expose_secret(), "Server=db;User ID=app;pwd=new;");
/// ```
pub fn replace_password(current: &SecretString, password: &SecretString) -> SecretString {
    let current = current.expose_secret();
    let password = quote_value(password.expose_secret());

    let mut replaced = false;
    let segments: Vec<String> = split_entries(current)
        .into_iter()
        .map(|segment| match segment.split_once('=') {
            Some((key, _)) if is_password_key(key) => {
                replaced = true;
                format!("{key}={password}")
            }
            _ => segment.to_string(),
        })
        .collect();

    let mut out = segments.join(";");
    if !replaced {
        if !out.is_empty() && !out.ends_with(';') {
            out.push(';');
        }
        out.push_str(&format!("Password={password};"));
    }

    SecretString::from(out)
}

/// Split on `;` outside quoted values
fn split_entries(input: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut start = 0;
    let mut in_value = false;
    let mut value_started = false;
    let mut quote: Option<char> = None;

    let mut chars = input.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        if let Some(open) = quote {
            if c == open {
                if chars.peek().is_some_and(|&(_, next)| next == open) {
                    chars.next();
                } else {
                    quote = None;
                }
            }
            continue;
        }

        match c {
            ';' => {
                entries.push(&input[start..index]);
                start = index + 1;
                in_value = false;
                value_started = false;
            }
            '=' if !in_value => in_value = true,
            '"' | '\'' if in_value && !value_started => {
                quote = Some(c);
                value_started = true;
            }
            c if in_value && !c.is_whitespace() => value_started = true,
            _ => {}
        }
    }
    entries.push(&input[start..]);
    entries
}

/// Quote a value that would otherwise break the entry list
fn quote_value(value: &str) -> String {
    let needs_quotes = value.contains(';')
        || value.starts_with(['"', '\''])
        || value.trim() != value;
    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn is_password_key(key: &str) -> bool {
    let key = key.trim();
    PASSWORD_KEYS
        .iter()
        .any(|candidate| key.eq_ignore_ascii_case(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn rewrite(current: &str, password: &str) -> String {
        replace_password(
            &SecretString::from(current.to_string()),
            &SecretString::from(password.to_string()),
        )
        .expose_secret()
        .to_string()
    }

    #[rstest]
    #[case(
        "Server=tcp:db,1433;User ID=app;Password=old;Encrypt=True;",
        "Server=tcp:db,1433;User ID=app;Password=n3w;Encrypt=True;"
    )]
    #[case("server=db;PASSWORD=old", "server=db;PASSWORD=n3w")]
    #[case("server=db; Pwd =old;", "server=db; Pwd =n3w;")]
    #[case("Password=a=b;Server=db", "Password=n3w;Server=db")]
    fn replaces_existing_password(#[case] current: &str, #[case] expected: &str) {
        assert_eq!(rewrite(current, "n3w"), expected);
    }

    #[rstest]
    #[case("Server=db;User ID=app;", "Server=db;User ID=app;Password=n3w;")]
    #[case("Server=db;User ID=app", "Server=db;User ID=app;Password=n3w;")]
    #[case("", "Password=n3w;")]
    fn appends_missing_password(#[case] current: &str, #[case] expected: &str) {
        assert_eq!(rewrite(current, "n3w"), expected);
    }

    #[test]
    fn similar_keys_are_untouched() {
        assert_eq!(
            rewrite("PasswordHint=x;Password=old", "n3w"),
            "PasswordHint=x;Password=n3w"
        );
    }

    #[rstest]
    #[case(r#"Server=db;Password="a;b";Encrypt=True"#, "Server=db;Password=n3w;Encrypt=True")]
    #[case("Server=db;Pwd='x;y''z';", "Server=db;Pwd=n3w;")]
    #[case(
        r#"Application Name="svc;api";Password=old"#,
        r#"Application Name="svc;api";Password=n3w"#
    )]
    fn quoted_values_keep_their_separators(#[case] current: &str, #[case] expected: &str) {
        assert_eq!(rewrite(current, "n3w"), expected);
    }

    #[test]
    fn password_with_separator_is_quoted() {
        assert_eq!(
            rewrite("Server=db;Password=old", r#"a;"b"#),
            r#"Server=db;Password="a;""b""#
        );
    }

    #[test]
    fn template_renders_all_parts() {
        let template = ConnectionTemplate {
            host: "mydb.database.windows.net".to_string(),
            database: Some("orders".to_string()),
            login: "app_user".to_string(),
        };

        let rendered = template.render(&SecretString::from("pw"));
        assert_eq!(
            rendered.expose_secret(),
            "Server=tcp:mydb.database.windows.net,1433;Initial Catalog=orders;User ID=app_user;Password=pw;Encrypt=True;"
        );
    }
}
