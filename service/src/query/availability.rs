//! [`Query`] collection related to the availability of a property.

use common::operations::By;

use crate::{
    domain::property,
    read::{reservation::Overlapping, Reservation},
};
#[cfg(doc)]
use crate::{domain::Stay, Query};

use super::DatabaseQuery;

/// Queries the first [`Reservation`] conflicting with a [`Stay`].
///
/// [`None`] means the property is available for the [`Stay`].
pub type Check = DatabaseQuery<By<Option<Reservation>, Overlapping>>;

/// Queries all the [`Reservation`]s of a property, ordered by check-in.
pub type Unavailable = DatabaseQuery<By<Vec<Reservation>, property::Id>>;

#[cfg(test)]
mod spec {
    use crate::{
        command::create_booking_request::spec::{paid, request},
        domain::{property, stay::spec::stay},
        infra::{
            gateway::{mock::Scripted, Outcome},
            Memory,
        },
        query::Query as _,
        read::{reservation::Overlapping, Reservation},
        spec::service,
    };

    use super::{Check, Unavailable};

    fn check(property: &str, from: &str, to: &str) -> Check {
        Check::by(Overlapping {
            property_id: property::Id::new(property).unwrap(),
            stay: stay(from, to),
        })
    }

    #[tokio::test]
    async fn detects_conflicts_with_confirmed_stays() {
        let (svc, _) = service(Memory::new(), Scripted::new(Outcome::Success));
        _ = paid(&svc, request("apt-1", "2030-03-03", "2030-03-07")).await;

        let conflict = svc
            .execute(check("apt-1", "2030-03-01", "2030-03-04"))
            .await
            .unwrap();
        assert_eq!(
            conflict.map(|r: Reservation| r.stay),
            Some(stay("2030-03-03", "2030-03-07")),
        );

        let touching = svc
            .execute(check("apt-1", "2030-03-01", "2030-03-03"))
            .await
            .unwrap();
        assert!(touching.is_none());
    }

    #[tokio::test]
    async fn lists_reservations_in_order() {
        let (svc, _) = service(Memory::new(), Scripted::new(Outcome::Success));
        _ = paid(&svc, request("apt-1", "2030-05-01", "2030-05-03")).await;
        _ = paid(&svc, request("apt-1", "2030-04-01", "2030-04-03")).await;
        // Pending requests don't hold dates.
        _ = svc
            .execute(request("apt-1", "2030-06-01", "2030-06-03"))
            .await
            .unwrap();

        let reserved = svc
            .execute(Unavailable::by(property::Id::new("apt-1").unwrap()))
            .await
            .unwrap();

        assert_eq!(
            reserved.iter().map(|r| r.stay).collect::<Vec<_>>(),
            [
                stay("2030-04-01", "2030-04-03"),
                stay("2030-05-01", "2030-05-03"),
            ],
        );
    }
}
