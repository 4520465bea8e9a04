/// Client-side screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Home,
    Profile { username: String },
    NotFound,
}

impl Route {
    pub fn parse(path: &str) -> Route {
        let path = path.trim();
        match path {
            "" | "/" => return Route::Login,
            "/home" | "/home/" => return Route::Home,
            _ => {}
        }
        match path.strip_prefix("/profile/") {
            Some(rest) => {
                let username = rest.trim_end_matches('/').trim_start_matches(':');
                if username.is_empty() || username == "undefined" || username.contains('/') {
                    Route::NotFound
                } else {
                    Route::Profile {
                        username: username.to_string(),
                    }
                }
            }
            None => Route::NotFound,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/".to_string(),
            Route::Home => "/home".to_string(),
            Route::Profile { username } => format!("/profile/{}", username),
            Route::NotFound => "/404".to_string(),
        }
    }

    /// Screens that show the post feed.
    pub fn has_feed(&self) -> bool {
        matches!(self, Route::Home | Route::Profile { .. })
    }
}
