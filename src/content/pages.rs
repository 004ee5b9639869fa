//! Fixed informational pages.
//!
//! Each page is a markdown file under the views directory. When the file is
//! missing, a built-in default is rendered instead so a fresh checkout still
//! serves every route.

/// Pages rendered by name rather than by content identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixedPage {
    ComingSoon,
    NotFound,
    SignIn,
    AuthFailed,
    Deauthorized,
    Forbidden,
}

impl FixedPage {
    pub const ALL: [FixedPage; 6] = [
        FixedPage::ComingSoon,
        FixedPage::NotFound,
        FixedPage::SignIn,
        FixedPage::AuthFailed,
        FixedPage::Deauthorized,
        FixedPage::Forbidden,
    ];

    /// File stem under the views directory (`views/<stem>.md`).
    pub fn file_stem(self) -> &'static str {
        match self {
            FixedPage::ComingSoon => "coming_soon",
            FixedPage::NotFound => "not_found",
            FixedPage::SignIn => "sign_in",
            FixedPage::AuthFailed => "auth_failed",
            FixedPage::Deauthorized => "deauthorized",
            FixedPage::Forbidden => "forbidden",
        }
    }

    pub fn default_markdown(self) -> &'static str {
        match self {
            FixedPage::ComingSoon => {
                "# Coming soon\n\nThis section hasn't been written yet. Check back shortly.\n"
            }
            FixedPage::NotFound => {
                "# Not found\n\nThere is nothing at this address. Try the [first section](/).\n"
            }
            FixedPage::SignIn => {
                "# Sign in\n\nThis material is available to organization members.\n\n\
                 [Sign in with GitHub](/auth/github)\n"
            }
            FixedPage::AuthFailed => {
                "# Sign-in failed\n\nGitHub did not complete the sign-in. \
                 [Try again](/sign-in).\n"
            }
            FixedPage::Deauthorized => {
                "# Access revoked\n\nYou have revoked this site's access to your GitHub account.\n"
            }
            FixedPage::Forbidden => {
                "# Members only\n\nYou are signed in, but your GitHub account is not a member \
                 of the organization that can read this material. [Sign out](/logout).\n"
            }
        }
    }
}
