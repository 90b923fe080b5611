//! HTTP client for end-to-end tests
//!
//! Wraps reqwest and provides one method per SkillWise endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::{RequestBuilder, Response};
use serde_json::{json, Value};
use std::time::Duration;

/// Parses the `{"success": true, "data": ...}` envelope and returns `data`.
pub async fn data(response: Response) -> Value {
    let body: Value = response.json().await.expect("Response is not JSON");
    assert_eq!(body["success"], json!(true), "Unexpected envelope: {}", body);
    body["data"].clone()
}

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle session cookies
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client logged in with the given credentials
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String, handle: &str, password: &str) -> Self {
        let client = Self::new(base_url);

        let response = client.login(handle, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Authentication of {} failed: {:?}",
            handle,
            response.text().await
        );

        client
    }

    pub async fn authenticated_student(base_url: String) -> Self {
        Self::authenticated(base_url, STUDENT_USER, STUDENT_PASS).await
    }

    pub async fn authenticated_friend(base_url: String) -> Self {
        Self::authenticated(base_url, FRIEND_USER, FRIEND_PASS).await
    }

    pub async fn authenticated_teacher(base_url: String) -> Self {
        Self::authenticated(base_url, TEACHER_USER, TEACHER_PASS).await
    }

    pub async fn authenticated_parent(base_url: String) -> Self {
        Self::authenticated(base_url, PARENT_USER, PARENT_PASS).await
    }

    pub async fn authenticated_child(base_url: String) -> Self {
        Self::authenticated(base_url, CHILD_USER, CHILD_PASS).await
    }

    pub async fn authenticated_admin(base_url: String) -> Self {
        Self::authenticated(base_url, ADMIN_USER, ADMIN_PASS).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send(request: RequestBuilder) -> Response {
        request.send().await.expect("Request failed")
    }

    async fn get(&self, path: &str) -> Response {
        Self::send(self.client.get(self.url(path))).await
    }

    async fn post(&self, path: &str, body: Value) -> Response {
        Self::send(self.client.post(self.url(path)).json(&body)).await
    }

    async fn post_empty(&self, path: &str) -> Response {
        Self::send(self.client.post(self.url(path))).await
    }

    async fn put(&self, path: &str, body: Value) -> Response {
        Self::send(self.client.put(self.url(path)).json(&body)).await
    }

    async fn put_empty(&self, path: &str) -> Response {
        Self::send(self.client.put(self.url(path))).await
    }

    async fn delete(&self, path: &str) -> Response {
        Self::send(self.client.delete(self.url(path))).await
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /api/auth/login
    pub async fn login(&self, handle: &str, password: &str) -> Response {
        self.post(
            "/auth/login",
            json!({ "handle": handle, "password": password }),
        )
        .await
    }

    /// POST /api/auth/register
    pub async fn register(&self, body: Value) -> Response {
        self.post("/auth/register", body).await
    }

    /// GET /api/auth/logout
    pub async fn logout(&self) -> Response {
        self.get("/auth/logout").await
    }

    /// GET /api/auth/session
    pub async fn session(&self) -> Response {
        self.get("/auth/session").await
    }

    /// GET /api/users/me
    pub async fn me(&self) -> Response {
        self.get("/users/me").await
    }

    /// GET /api/users/{id}
    pub async fn profile(&self, user_id: usize) -> Response {
        self.get(&format!("/users/{}", user_id)).await
    }

    // ========================================================================
    // Learning Endpoints
    // ========================================================================

    /// GET /api/learning/courses
    pub async fn list_courses(&self) -> Response {
        self.get("/learning/courses").await
    }

    /// GET /api/learning/courses?tag=
    pub async fn list_courses_by_tag(&self, tag: &str) -> Response {
        self.get(&format!("/learning/courses?tag={}", tag)).await
    }

    /// POST /api/learning/courses
    pub async fn create_course(&self, body: Value) -> Response {
        self.post("/learning/courses", body).await
    }

    /// GET /api/learning/courses/{id}
    pub async fn get_course(&self, course_id: &str) -> Response {
        self.get(&format!("/learning/courses/{}", course_id)).await
    }

    /// PUT /api/learning/courses/{id}
    pub async fn update_course(&self, course_id: &str, body: Value) -> Response {
        self.put(&format!("/learning/courses/{}", course_id), body)
            .await
    }

    /// DELETE /api/learning/courses/{id}
    pub async fn delete_course(&self, course_id: &str) -> Response {
        self.delete(&format!("/learning/courses/{}", course_id))
            .await
    }

    /// POST /api/learning/courses/{id}/enroll
    pub async fn enroll(&self, course_id: &str) -> Response {
        self.post_empty(&format!("/learning/courses/{}/enroll", course_id))
            .await
    }

    /// DELETE /api/learning/courses/{id}/enroll
    pub async fn unenroll(&self, course_id: &str) -> Response {
        self.delete(&format!("/learning/courses/{}/enroll", course_id))
            .await
    }

    /// PUT /api/learning/courses/{id}/current-lecture
    pub async fn set_current_lecture(&self, course_id: &str, lecture_index: usize) -> Response {
        self.put(
            &format!("/learning/courses/{}/current-lecture", course_id),
            json!({ "lectureIndex": lecture_index }),
        )
        .await
    }

    /// POST /api/learning/courses/{id}/lectures/{index}/complete
    pub async fn complete_lecture(&self, course_id: &str, lecture_index: usize) -> Response {
        self.post_empty(&format!(
            "/learning/courses/{}/lectures/{}/complete",
            course_id, lecture_index
        ))
        .await
    }

    /// POST /api/learning/courses/{id}/lectures/{index}/quiz
    pub async fn submit_quiz(
        &self,
        course_id: &str,
        lecture_index: usize,
        score: i64,
        passed: bool,
    ) -> Response {
        self.post(
            &format!(
                "/learning/courses/{}/lectures/{}/quiz",
                course_id, lecture_index
            ),
            json!({ "score": score, "passed": passed }),
        )
        .await
    }

    /// GET /api/learning/courses/{id}/lectures/{index}/quiz
    pub async fn quiz_history(&self, course_id: &str, lecture_index: usize) -> Response {
        self.get(&format!(
            "/learning/courses/{}/lectures/{}/quiz",
            course_id, lecture_index
        ))
        .await
    }

    /// GET /api/learning/courses/{id}/progress
    pub async fn progress(&self, course_id: &str) -> Response {
        self.get(&format!("/learning/courses/{}/progress", course_id))
            .await
    }

    /// GET /api/learning/enrollments
    pub async fn enrollments(&self) -> Response {
        self.get("/learning/enrollments").await
    }

    /// Creates a published course with `lectures` lectures and returns its id
    pub async fn create_published_course(&self, title: &str, lectures: usize) -> String {
        let lectures: Vec<Value> = (0..lectures)
            .map(|i| json!({ "title": format!("Lecture {}", i + 1), "durationMinutes": 10 }))
            .collect();
        let response = self
            .create_course(json!({
                "title": title,
                "description": "A course for end-to-end tests",
                "tags": ["testing"],
                "published": true,
                "lectures": lectures,
            }))
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        data(response).await["id"]
            .as_str()
            .expect("Course has no id")
            .to_string()
    }

    // ========================================================================
    // Community Endpoints
    // ========================================================================

    /// GET /api/community/feed
    pub async fn feed(&self) -> Response {
        self.get("/community/feed").await
    }

    /// GET /api/community/feed?limit=&offset=
    pub async fn feed_page(&self, limit: usize, offset: usize) -> Response {
        self.get(&format!(
            "/community/feed?limit={}&offset={}",
            limit, offset
        ))
        .await
    }

    /// GET /api/community/users/{id}/posts
    pub async fn user_posts(&self, user_id: usize) -> Response {
        self.get(&format!("/community/users/{}/posts", user_id))
            .await
    }

    /// POST /api/community/posts
    pub async fn create_post(&self, body: Value) -> Response {
        self.post("/community/posts", body).await
    }

    /// Creates a blog post with the given privacy and returns its id
    pub async fn create_blog_post(&self, content: &str, privacy: &str) -> String {
        let response = self
            .create_post(json!({
                "postType": "blog",
                "privacy": privacy,
                "content": content,
            }))
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        data(response).await["id"]
            .as_str()
            .expect("Post has no id")
            .to_string()
    }

    /// GET /api/community/posts/{id}
    pub async fn get_post(&self, post_id: &str) -> Response {
        self.get(&format!("/community/posts/{}", post_id)).await
    }

    /// DELETE /api/community/posts/{id}
    pub async fn delete_post(&self, post_id: &str) -> Response {
        self.delete(&format!("/community/posts/{}", post_id)).await
    }

    /// PUT /api/community/posts/{id}/privacy
    pub async fn set_post_privacy(&self, post_id: &str, privacy: &str) -> Response {
        self.put(
            &format!("/community/posts/{}/privacy", post_id),
            json!({ "privacy": privacy }),
        )
        .await
    }

    /// POST /api/community/posts/{id}/share
    pub async fn share_post(&self, post_id: &str, caption: Option<&str>) -> Response {
        let path = format!("/community/posts/{}/share", post_id);
        match caption {
            Some(caption) => self.post(&path, json!({ "caption": caption })).await,
            None => self.post_empty(&path).await,
        }
    }

    /// POST /api/community/posts/{id}/like
    pub async fn toggle_like(&self, post_id: &str) -> Response {
        self.post_empty(&format!("/community/posts/{}/like", post_id))
            .await
    }

    /// POST /api/community/posts/{id}/vote
    pub async fn vote(&self, post_id: &str, option_index: usize) -> Response {
        self.post(
            &format!("/community/posts/{}/vote", post_id),
            json!({ "optionIndex": option_index }),
        )
        .await
    }

    /// GET /api/community/posts/{id}/comments
    pub async fn comments(&self, post_id: &str) -> Response {
        self.get(&format!("/community/posts/{}/comments", post_id))
            .await
    }

    /// POST /api/community/posts/{id}/comments
    pub async fn add_comment(&self, post_id: &str, body: Value) -> Response {
        self.post(&format!("/community/posts/{}/comments", post_id), body)
            .await
    }

    // ========================================================================
    // Friends Endpoints
    // ========================================================================

    /// GET /api/friends
    pub async fn friends(&self) -> Response {
        self.get("/friends").await
    }

    /// GET /api/friends/requests
    pub async fn friend_requests(&self) -> Response {
        self.get("/friends/requests").await
    }

    /// POST /api/friends/requests/{user_id}
    pub async fn send_friend_request(&self, user_id: usize) -> Response {
        self.post_empty(&format!("/friends/requests/{}", user_id))
            .await
    }

    /// POST /api/friends/requests/{user_id}/accept
    pub async fn accept_friend_request(&self, user_id: usize) -> Response {
        self.post_empty(&format!("/friends/requests/{}/accept", user_id))
            .await
    }

    /// DELETE /api/friends/{user_id}
    pub async fn remove_friend(&self, user_id: usize) -> Response {
        self.delete(&format!("/friends/{}", user_id)).await
    }

    // ========================================================================
    // Family Endpoints
    // ========================================================================

    /// GET /api/family/requests
    pub async fn family_requests(&self) -> Response {
        self.get("/family/requests").await
    }

    /// POST /api/family/requests/{user_id}
    pub async fn request_family_link(&self, user_id: usize) -> Response {
        self.post_empty(&format!("/family/requests/{}", user_id))
            .await
    }

    /// POST /api/family/requests/{user_id}/accept
    pub async fn accept_family_link(&self, user_id: usize) -> Response {
        self.post_empty(&format!("/family/requests/{}/accept", user_id))
            .await
    }

    /// DELETE /api/family/links/{user_id}
    pub async fn unlink_family(&self, user_id: usize) -> Response {
        self.delete(&format!("/family/links/{}", user_id)).await
    }

    /// GET /api/family/children
    pub async fn children(&self) -> Response {
        self.get("/family/children").await
    }

    /// GET /api/family/parents
    pub async fn parents(&self) -> Response {
        self.get("/family/parents").await
    }

    /// PUT /api/family/children/{child_id}/childlock
    pub async fn set_childlock(&self, child_id: usize, password: Option<&str>) -> Response {
        self.put(
            &format!("/family/children/{}/childlock", child_id),
            json!({ "password": password }),
        )
        .await
    }

    /// POST /api/family/childlock/verify
    pub async fn verify_childlock(&self, password: &str) -> Response {
        self.post("/family/childlock/verify", json!({ "password": password }))
            .await
    }

    /// GET /api/family/children/{child_id}/enrollments
    pub async fn child_enrollments(&self, child_id: usize) -> Response {
        self.get(&format!("/family/children/{}/enrollments", child_id))
            .await
    }

    /// GET /api/family/children/{child_id}/courses/{course_id}/progress
    pub async fn child_progress(&self, child_id: usize, course_id: &str) -> Response {
        self.get(&format!(
            "/family/children/{}/courses/{}/progress",
            child_id, course_id
        ))
        .await
    }

    // ========================================================================
    // Notification Endpoints
    // ========================================================================

    /// GET /api/notifications
    pub async fn notifications(&self) -> Response {
        self.get("/notifications").await
    }

    /// GET /api/notifications/unread-count
    pub async fn unread_count(&self) -> Response {
        self.get("/notifications/unread-count").await
    }

    /// PUT /api/notifications/{id}/read
    pub async fn mark_notification_read(&self, notification_id: &str) -> Response {
        self.put_empty(&format!("/notifications/{}/read", notification_id))
            .await
    }

    /// PUT /api/notifications/read-all
    pub async fn mark_all_notifications_read(&self) -> Response {
        self.put_empty("/notifications/read-all").await
    }

    // ========================================================================
    // Marketplace Endpoints
    // ========================================================================

    /// GET /api/marketplace/listings
    pub async fn listings(&self) -> Response {
        self.get("/marketplace/listings").await
    }

    /// GET /api/marketplace/listings/mine
    pub async fn my_listings(&self) -> Response {
        self.get("/marketplace/listings/mine").await
    }

    /// GET /api/marketplace/listings/{id}
    pub async fn get_listing(&self, listing_id: &str) -> Response {
        self.get(&format!("/marketplace/listings/{}", listing_id))
            .await
    }

    /// POST /api/marketplace/listings, optionally presenting a childlock password
    pub async fn create_listing(&self, body: Value, childlock: Option<&str>) -> Response {
        let mut request = self
            .client
            .post(self.url("/marketplace/listings"))
            .json(&body);
        if let Some(password) = childlock {
            request = request.header("X-Childlock", password);
        }
        Self::send(request).await
    }

    /// DELETE /api/marketplace/listings/{id}
    pub async fn delete_listing(&self, listing_id: &str) -> Response {
        self.delete(&format!("/marketplace/listings/{}", listing_id))
            .await
    }

    // ========================================================================
    // Admin Endpoints
    // ========================================================================

    /// GET /api/admin/users
    pub async fn admin_users(&self) -> Response {
        self.get("/admin/users").await
    }

    /// GET /api/admin/stats
    pub async fn admin_stats(&self) -> Response {
        self.get("/admin/stats").await
    }

    /// PUT /api/admin/users/{id}/role
    pub async fn admin_set_role(&self, user_id: usize, role: &str) -> Response {
        self.put(
            &format!("/admin/users/{}/role", user_id),
            json!({ "role": role }),
        )
        .await
    }

    /// PUT /api/admin/users/{id}/block
    pub async fn admin_block(&self, user_id: usize) -> Response {
        self.put_empty(&format!("/admin/users/{}/block", user_id))
            .await
    }

    /// PUT /api/admin/users/{id}/unblock
    pub async fn admin_unblock(&self, user_id: usize) -> Response {
        self.put_empty(&format!("/admin/users/{}/unblock", user_id))
            .await
    }

    /// GET /api/admin/moderation/listings
    pub async fn pending_listings(&self) -> Response {
        self.get("/admin/moderation/listings").await
    }

    /// PUT /api/admin/moderation/listings/{id}
    pub async fn moderate_listing(&self, listing_id: &str, decision: &str) -> Response {
        self.put(
            &format!("/admin/moderation/listings/{}", listing_id),
            json!({ "decision": decision, "note": "reviewed in tests" }),
        )
        .await
    }

    /// DELETE /api/admin/posts/{id}
    pub async fn admin_remove_post(&self, post_id: &str) -> Response {
        self.delete(&format!("/admin/posts/{}", post_id)).await
    }
}
