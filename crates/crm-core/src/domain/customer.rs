//! 고객 레코드.

use serde::{Deserialize, Serialize};

use super::UserId;

/// 고객 식별자 (customers.id, SERIAL).
pub type CustomerId = i32;

/// 저장된 고객 레코드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub surname: String,
    #[cfg_attr(feature = "sqlx-support", sqlx(default))]
    pub photo_url: Option<String>,
    /// 생성한 사용자
    pub creator_id: UserId,
    /// 마지막으로 수정한 사용자
    pub modifier_id: UserId,
}

/// 새 고객 입력.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub surname: String,
    pub photo_url: Option<String>,
}

/// 고객 부분 수정 입력.
///
/// 비어 있는 값은 변경 없음으로 취급합니다.
#[derive(Debug, Clone, Default)]
pub struct CustomerChanges {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub photo_url: Option<String>,
}

impl CustomerChanges {
    /// 빈 문자열을 `None`으로 정규화합니다.
    pub fn normalized(self) -> Self {
        fn non_empty(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.is_empty())
        }

        Self {
            name: non_empty(self.name),
            surname: non_empty(self.surname),
            photo_url: non_empty(self.photo_url),
        }
    }

    /// 변경 사항을 레코드에 적용합니다. 수정자는 항상 `actor`로 바뀝니다.
    pub fn apply_to(self, customer: &mut Customer, actor: UserId) {
        let changes = self.normalized();
        if let Some(name) = changes.name {
            customer.name = name;
        }
        if let Some(surname) = changes.surname {
            customer.surname = surname;
        }
        if let Some(photo_url) = changes.photo_url {
            customer.photo_url = Some(photo_url);
        }
        customer.modifier_id = actor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> Customer {
        Customer {
            id: 7,
            name: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            photo_url: None,
            creator_id: 1,
            modifier_id: 1,
        }
    }

    #[test]
    fn test_apply_changes_skips_empty_values() {
        let mut record = customer();
        CustomerChanges {
            name: Some(String::new()),
            surname: Some("Byron".to_string()),
            photo_url: None,
        }
        .apply_to(&mut record, 2);

        assert_eq!(record.name, "Ada");
        assert_eq!(record.surname, "Byron");
        assert_eq!(record.photo_url, None);
        assert_eq!(record.creator_id, 1);
        assert_eq!(record.modifier_id, 2);
    }

    #[test]
    fn test_apply_photo_url() {
        let mut record = customer();
        CustomerChanges {
            photo_url: Some("http://localhost:9000/profile-folder/a.png".to_string()),
            ..Default::default()
        }
        .apply_to(&mut record, 3);

        assert_eq!(
            record.photo_url.as_deref(),
            Some("http://localhost:9000/profile-folder/a.png")
        );
        assert_eq!(record.modifier_id, 3);
    }
}
