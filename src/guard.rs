//! Route gating: a pure function of session state deciding what a navigable
//! path should show. While the persisted token is still being read (or an
//! auth operation is in flight) every route resolves to a loading indicator,
//! which prevents a redirect flash before startup credentials land.

/// Snapshot of the session as the guard sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionView {
    pub authenticated: bool,
    /// Initial token load or an auth operation in flight.
    pub busy: bool,
}

/// The app's navigable paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    CompanyRegister,
    Home,
    Groups,
    GroupDetail,
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Only sensible when logged out (login, register forms).
    PublicOnly,
    /// Requires a session.
    Protected,
}

impl Route {
    pub fn class(&self) -> RouteClass {
        match self {
            Route::Login | Route::Register | Route::CompanyRegister => RouteClass::PublicOnly,
            Route::Home | Route::Groups | Route::GroupDetail | Route::Upload => RouteClass::Protected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Render,
    RedirectToLogin,
    RedirectToHome,
    Loading,
}

pub fn decide(route: Route, view: &SessionView) -> RouteDecision {
    if view.busy {
        return RouteDecision::Loading;
    }
    match (route.class(), view.authenticated) {
        (RouteClass::PublicOnly, true) => RouteDecision::RedirectToHome,
        (RouteClass::PublicOnly, false) => RouteDecision::Render,
        (RouteClass::Protected, true) => RouteDecision::Render,
        (RouteClass::Protected, false) => RouteDecision::RedirectToLogin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHED: SessionView = SessionView { authenticated: true, busy: false };
    const ANON: SessionView = SessionView { authenticated: false, busy: false };

    #[test]
    fn policy_table() {
        for route in [Route::Login, Route::Register, Route::CompanyRegister] {
            assert_eq!(decide(route, &AUTHED), RouteDecision::RedirectToHome);
            assert_eq!(decide(route, &ANON), RouteDecision::Render);
        }
        for route in [Route::Home, Route::Groups, Route::GroupDetail, Route::Upload] {
            assert_eq!(decide(route, &AUTHED), RouteDecision::Render);
            assert_eq!(decide(route, &ANON), RouteDecision::RedirectToLogin);
        }
    }

    #[test]
    fn busy_always_renders_loading() {
        let busy_anon = SessionView { authenticated: false, busy: true };
        let busy_authed = SessionView { authenticated: true, busy: true };
        for route in [Route::Login, Route::Home, Route::Upload] {
            assert_eq!(decide(route, &busy_anon), RouteDecision::Loading);
            assert_eq!(decide(route, &busy_authed), RouteDecision::Loading);
        }
    }
}
