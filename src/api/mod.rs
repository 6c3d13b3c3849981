use rocket::Route;

mod common;
mod public;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(public::routes());
    routes.extend(voting::routes());
    routes
}
