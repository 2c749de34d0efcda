use actix_web::{get, post, web, HttpResponse};
use serde::Serialize;

use crate::auth::{self, PasswordScheme};
use crate::error::{json_error_handler, ApiError};
use crate::schemas::{Credentials, Group, GroupExpense, PersonalExpense, PublicUser, RoommateTx, User};
use crate::store::RecordStore;
use crate::{groups, personal, roommate};

type Store = web::Data<dyn RecordStore>;

#[derive(Serialize)]
struct Confirmation {
    message: &'static str,
}

#[derive(Serialize)]
struct LoginResponse {
    message: &'static str,
    user: PublicUser,
}

fn confirm(message: &'static str) -> HttpResponse {
    HttpResponse::Ok().json(Confirmation { message })
}

#[post("/register")]
async fn register(
    store: Store,
    scheme: web::Data<PasswordScheme>,
    json: web::Json<User>,
) -> Result<HttpResponse, ApiError> {
    auth::register(store.get_ref(), scheme.get_ref(), json.into_inner()).await?;
    Ok(confirm("Registered"))
}

#[post("/login")]
async fn login(
    store: Store,
    scheme: web::Data<PasswordScheme>,
    json: web::Json<Credentials>,
) -> Result<HttpResponse, ApiError> {
    let user = auth::login(store.get_ref(), scheme.get_ref(), json.into_inner()).await?;
    Ok(HttpResponse::Ok().json(LoginResponse {
        message: "Success",
        user,
    }))
}

#[get("/personal/{email}")]
async fn personal_list(store: Store, email: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let expenses = personal::list_for_user(store.get_ref(), &email.into_inner()).await?;
    Ok(HttpResponse::Ok().json(expenses))
}

#[post("/personal/add")]
async fn personal_add(
    store: Store,
    json: web::Json<PersonalExpense>,
) -> Result<HttpResponse, ApiError> {
    personal::add(store.get_ref(), json.into_inner()).await?;
    Ok(confirm("Saved"))
}

#[get("/groups")]
async fn group_list(store: Store) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(groups::list_all(store.get_ref()).await?))
}

#[post("/groups/create")]
async fn group_create(store: Store, json: web::Json<Group>) -> Result<HttpResponse, ApiError> {
    groups::create(store.get_ref(), json.into_inner()).await?;
    Ok(confirm("Group Created"))
}

#[get("/groups/{id}/expenses")]
async fn group_expense_list(
    store: Store,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let expenses = groups::list_expenses(store.get_ref(), &id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(expenses))
}

#[post("/groups/expense/add")]
async fn group_expense_add(
    store: Store,
    json: web::Json<GroupExpense>,
) -> Result<HttpResponse, ApiError> {
    groups::add_expense(store.get_ref(), json.into_inner()).await?;
    Ok(confirm("Expense Added"))
}

#[get("/roommate")]
async fn roommate_list(store: Store) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(roommate::list_all(store.get_ref()).await?))
}

#[post("/roommate/add")]
async fn roommate_add(store: Store, json: web::Json<RoommateTx>) -> Result<HttpResponse, ApiError> {
    roommate::add(store.get_ref(), json.into_inner()).await?;
    Ok(confirm("Saved"))
}

#[get("/health")]
async fn health(store: Store) -> Result<HttpResponse, ApiError> {
    store.ping().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}

/// Mounts every endpoint under `/api`. Expects a `Data<dyn RecordStore>`
/// and a `Data<PasswordScheme>` registered on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .service(register)
            .service(login)
            .service(personal_add)
            .service(personal_list)
            .service(group_list)
            .service(group_create)
            .service(group_expense_add)
            .service(group_expense_list)
            .service(roommate_list)
            .service(roommate_add)
            .service(health),
    );
}
