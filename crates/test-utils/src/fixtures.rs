//! Shared catalog fixtures.
//!
//! Use these for tests where the exact catalog doesn't matter, just that it
//! has nested relations, arguments and opaque targets. When the catalog shape
//! is the point of the test, build one inline so the test reads on its own.

use graphql_definitions::Definitions;

/// A blog catalog in the persisted artifact format.
///
/// - `user -> posts -> comments -> author` chains, with `first` arguments
/// - `user.avatar` targets `image`, which is not in the catalog (a leaf)
/// - `user.followers` points back at `user`
/// - `login` selects a credential-looking argument
pub const BLOG_DEFINITIONS: &str = r#"{
  "entities": {
    "user": {
      "entity": "User",
      "fields": "id name email",
      "availableInc": {
        "posts": { "type": "post", "args": { "first": "Int", "orderBy": "String" } },
        "profile": { "type": "profile", "args": {} },
        "avatar": { "type": "image", "args": { "size": "Int" } },
        "followers": { "type": "user", "args": { "first": "Int" } }
      }
    },
    "post": {
      "entity": "Post",
      "fields": "id title body",
      "availableInc": {
        "author": { "type": "user", "args": {} },
        "comments": { "type": "comment", "args": { "first": "Int" } },
        "tags": { "type": "tag", "args": {} }
      }
    },
    "comment": {
      "entity": "Comment",
      "fields": "id body",
      "availableInc": {
        "author": { "type": "user", "args": {} },
        "post": { "type": "post", "args": {} }
      }
    },
    "tag": { "entity": "Tag", "fields": "id label", "availableInc": {} },
    "profile": { "entity": "Profile", "fields": "bio website", "availableInc": {} }
  },
  "query": {
    "user": [{ "id": "ID!" }, "user"],
    "users": [{ "first": "Int", "search": "String" }, "user"],
    "post": [{ "id": "ID!" }, "post"],
    "posts": [{ "first": "Int" }, "post"],
    "userCount": [{}, "int"]
  },
  "mutation": {
    "createPost": [{ "title": "String!", "body": "String" }, "post"],
    "deletePost": [{ "id": "ID!" }, "boolean"],
    "login": [{ "email": "String!", "password": "String!" }, "session"]
  },
  "subscription": {
    "postAdded": [{}, "post"],
    "commentAdded": [{ "postId": "ID!" }, "comment"]
  }
}"#;

/// The blog catalog, parsed.
pub fn fixture_definitions() -> Definitions {
    Definitions::from_json_str(BLOG_DEFINITIONS).expect("blog fixture is a valid definitions artifact")
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphql_definitions::OperationKind;

    #[test]
    fn test_fixture_parses() {
        let definitions = fixture_definitions();
        assert_eq!(definitions.entities.len(), 5);
        assert_eq!(definitions.operation_count(), 10);
        assert!(definitions.entity("image").is_none());
        assert!(definitions.operation(OperationKind::Subscription, "postAdded").is_some());
    }
}
