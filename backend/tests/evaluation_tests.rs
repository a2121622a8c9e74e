//! Evaluation recording and deletion tests
//!
//! Runs the evaluation service against the in-memory store, including
//! injected store failures to check that nothing is half written.

mod common;

use common::*;
use irrigation_uniformity_backend::error::AppError;
use irrigation_uniformity_backend::services::evaluation::{EvaluationService, MeasurementInput};
use irrigation_uniformity_backend::store::{FailPoint, UniformityStore};
use shared::{
    MediaReference, MediaType, PointPosition, UniformityClass, UniformityError, UnitRef,
};
use uuid::Uuid;

fn photo() -> MediaReference {
    MediaReference {
        id: Uuid::new_v4(),
        file_type: MediaType::Image,
        url: "https://media.example.com/collector-3.jpg".to_string(),
        original_filename: Some("collector-3.jpg".to_string()),
    }
}

fn reference_points() -> Vec<MeasurementInput> {
    [8.0, 9.0, 10.0, 11.0, 12.0]
        .iter()
        .enumerate()
        .map(|(i, q)| sector_point(i as i32 + 1, *q))
        .collect()
}

// =============================================================================
// Recording
// =============================================================================

mod create {
    use super::*;

    #[tokio::test]
    async fn records_evaluation_with_points() {
        let farm = farm().await;
        let sector = farm.add_sector("Setor 1").await;
        let service = EvaluationService::new(farm.store.clone());
        let evaluator = Uuid::new_v4();

        let created = service
            .create_evaluation(evaluator, evaluation_input(sector.unit_ref(), reference_points()))
            .await
            .unwrap();

        assert_eq!(created.unit, sector.unit_ref());
        assert_eq!(created.point_count, 5);
        assert_eq!(created.coefficients.cuc.value, 88.0);
        assert_eq!(created.coefficients.cud.value, 85.0);
        assert_eq!(created.coefficients.cue.value, 85.86);
        assert_eq!(created.coefficients.cuc.class, UniformityClass::Good);
        assert_eq!(created.coefficients.cud.class, UniformityClass::Good);
        assert_eq!(created.coefficients.cue.class, UniformityClass::VeryGood);

        let detail = service.get_evaluation(created.id).await.unwrap();
        assert_eq!(detail.evaluation.evaluator_id, evaluator);
        assert_eq!(detail.points.len(), 5);
        assert!(detail
            .points
            .iter()
            .all(|p| matches!(p.position, PointPosition::Sector { .. })));
        assert_eq!(farm.store.point_count().await, 5);
    }

    #[tokio::test]
    async fn pivot_flow_rates_are_derived() {
        let farm = farm().await;
        let pivot = farm.add_pivot("Pivô 2").await;
        let service = EvaluationService::new(farm.store.clone());

        // 1 L per hour at every collector
        let points = vec![
            pivot_point(1, 1000.0, 3600.0),
            pivot_point(2, 500.0, 1800.0),
            pivot_point(3, 250.0, 900.0),
        ];
        let created = service
            .create_evaluation(Uuid::new_v4(), evaluation_input(pivot.unit_ref(), points))
            .await
            .unwrap();

        assert_eq!(created.coefficients.cuc.value, 100.0);

        let detail = service.get_evaluation(created.id).await.unwrap();
        assert!(detail.points.iter().all(|p| p.flow_rate_l_h == 1.0));
        assert_eq!(
            detail.points[1].position,
            PointPosition::Pivot {
                distance_m: Some(10.0),
                collector_diameter_mm: 80.0
            }
        );
    }

    #[tokio::test]
    async fn no_usable_flow_rate_stores_zero_coefficients() {
        let farm = farm().await;
        let sector = farm.add_sector("Setor 1").await;
        let service = EvaluationService::new(farm.store.clone());

        let points = vec![sector_point(1, 0.0), sector_point(2, -1.0)];
        let created = service
            .create_evaluation(Uuid::new_v4(), evaluation_input(sector.unit_ref(), points))
            .await
            .unwrap();

        assert_eq!(created.coefficients.cuc.value, 0.0);
        assert_eq!(created.coefficients.cud.value, 0.0);
        assert_eq!(created.coefficients.cue.value, 0.0);
        assert_eq!(created.coefficients.cuc.class, UniformityClass::Inacceptable);
        // The unusable readings are still stored
        assert_eq!(farm.store.point_count().await, 2);
    }

    #[tokio::test]
    async fn unusable_readings_do_not_affect_coefficients() {
        let farm = farm().await;
        let sector = farm.add_sector("Setor 1").await;
        let service = EvaluationService::new(farm.store.clone());

        let mut points = reference_points();
        points.push(sector_point(6, 0.0));
        let created = service
            .create_evaluation(Uuid::new_v4(), evaluation_input(sector.unit_ref(), points))
            .await
            .unwrap();

        assert_eq!(created.coefficients.cuc.value, 88.0);
        assert_eq!(created.point_count, 6);
    }

    #[tokio::test]
    async fn comment_and_recommendations_are_stored_separately() {
        let farm = farm().await;
        let sector = farm.add_sector("Setor 1").await;
        let service = EvaluationService::new(farm.store.clone());

        let mut input = evaluation_input(sector.unit_ref(), reference_points());
        input.comment = Some("  Emissores entupidos na linha 4  ".to_string());
        input.recommendations = Some("Limpar filtros de disco".to_string());

        let created = service
            .create_evaluation(Uuid::new_v4(), input)
            .await
            .unwrap();
        let detail = service.get_evaluation(created.id).await.unwrap();

        assert_eq!(detail.comments.len(), 2);
        assert_eq!(
            detail.comment.as_deref(),
            Some("Emissores entupidos na linha 4")
        );
        assert_eq!(
            detail.recommendations.as_deref(),
            Some("Limpar filtros de disco")
        );
    }

    #[tokio::test]
    async fn comment_starting_with_the_marker_stays_a_comment() {
        let farm = farm().await;
        let sector = farm.add_sector("Setor 1").await;
        let service = EvaluationService::new(farm.store.clone());

        let mut input = evaluation_input(sector.unit_ref(), reference_points());
        input.comment = Some("[RECOMMENDATIONS] trocar o filtro".to_string());

        let created = service
            .create_evaluation(Uuid::new_v4(), input)
            .await
            .unwrap();
        let detail = service.get_evaluation(created.id).await.unwrap();

        assert_eq!(detail.comment.as_deref(), Some("trocar o filtro"));
        assert_eq!(detail.recommendations, None);
    }

    #[tokio::test]
    async fn huge_flow_rates_are_rejected_not_stored() {
        let farm = farm().await;
        let sector = farm.add_sector("Setor 1").await;
        let service = EvaluationService::new(farm.store.clone());

        let huge = |sequence| MeasurementInput {
            volume_ml: 100.0,
            flow_rate_l_h: Some(1e308),
            ..sector_point(sequence, 1.0)
        };
        let points = vec![huge(1), huge(2)];
        let err = service
            .create_evaluation(Uuid::new_v4(), evaluation_input(sector.unit_ref(), points))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Uniformity(UniformityError::InvalidMeasurement(_))
        ));
        assert_eq!(farm.store.evaluation_count().await, 0);
    }

    #[tokio::test]
    async fn blank_comment_is_not_stored() {
        let farm = farm().await;
        let sector = farm.add_sector("Setor 1").await;
        let service = EvaluationService::new(farm.store.clone());

        let mut input = evaluation_input(sector.unit_ref(), reference_points());
        input.comment = Some("   ".to_string());

        service
            .create_evaluation(Uuid::new_v4(), input)
            .await
            .unwrap();
        assert_eq!(farm.store.comment_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_unit_is_target_not_found() {
        let farm = farm().await;
        let service = EvaluationService::new(farm.store.clone());

        let err = service
            .create_evaluation(
                Uuid::new_v4(),
                evaluation_input(UnitRef::HydraulicSector(Uuid::new_v4()), reference_points()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::TargetNotFound(_)));
        assert_eq!(farm.store.evaluation_count().await, 0);
    }

    #[tokio::test]
    async fn unit_is_looked_up_in_its_own_table_only() {
        let farm = farm().await;
        let pivot = farm.add_pivot("Pivô 1").await;
        let service = EvaluationService::new(farm.store.clone());

        // Pivot id sent with the sector tag
        let err = service
            .create_evaluation(
                Uuid::new_v4(),
                evaluation_input(UnitRef::HydraulicSector(pivot.id), reference_points()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::TargetNotFound(_)));
    }

    #[tokio::test]
    async fn zero_duration_without_flow_rate_is_invalid_request() {
        let farm = farm().await;
        let pivot = farm.add_pivot("Pivô 1").await;
        let service = EvaluationService::new(farm.store.clone());

        let points = vec![pivot_point(1, 1000.0, 3600.0), pivot_point(2, 400.0, 0.0)];
        let err = service
            .create_evaluation(Uuid::new_v4(), evaluation_input(pivot.unit_ref(), points))
            .await
            .unwrap_err();

        match err {
            AppError::InvalidRequest { field, .. } => assert_eq!(field, "points[1]"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(farm.store.evaluation_count().await, 0);
        assert_eq!(farm.store.point_count().await, 0);
    }

    #[tokio::test]
    async fn empty_point_list_is_invalid_request() {
        let farm = farm().await;
        let sector = farm.add_sector("Setor 1").await;
        let service = EvaluationService::new(farm.store.clone());

        let err = service
            .create_evaluation(Uuid::new_v4(), evaluation_input(sector.unit_ref(), vec![]))
            .await
            .unwrap_err();

        match err {
            AppError::InvalidRequest { field, .. } => assert_eq!(field, "points"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn negative_irrigated_area_is_invalid_request() {
        let farm = farm().await;
        let sector = farm.add_sector("Setor 1").await;
        let service = EvaluationService::new(farm.store.clone());

        let mut input = evaluation_input(sector.unit_ref(), reference_points());
        input.irrigated_area = -1.0;

        let err = service
            .create_evaluation(Uuid::new_v4(), input)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest { .. }));
    }
}

// =============================================================================
// Atomicity of recording
// =============================================================================

mod create_rollback {
    use super::*;

    async fn assert_nothing_written(fail_point: FailPoint) {
        let farm = farm().await;
        let sector = farm.add_sector("Setor 1").await;
        let service = EvaluationService::new(farm.store.clone());

        let mut input = evaluation_input(sector.unit_ref(), reference_points());
        input.comment = Some("Vento forte durante o teste".to_string());
        input.recommendations = Some("Repetir pela manhã".to_string());

        farm.store.fail_on(fail_point).await;
        let err = service
            .create_evaluation(Uuid::new_v4(), input)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::OperationFailed(_)));
        assert_eq!(farm.store.evaluation_count().await, 0);
        assert_eq!(farm.store.point_count().await, 0);
        assert_eq!(farm.store.comment_count().await, 0);
    }

    #[tokio::test]
    async fn failing_evaluation_insert() {
        assert_nothing_written(FailPoint::InsertEvaluation).await;
    }

    #[tokio::test]
    async fn failing_point_insert() {
        assert_nothing_written(FailPoint::InsertPoints).await;
    }

    #[tokio::test]
    async fn failing_comment_insert() {
        assert_nothing_written(FailPoint::InsertComment).await;
    }

    #[tokio::test]
    async fn failing_commit() {
        assert_nothing_written(FailPoint::Commit).await;
    }
}

// =============================================================================
// Reads
// =============================================================================

mod read {
    use super::*;

    #[tokio::test]
    async fn unknown_evaluation_is_not_found() {
        let farm = farm().await;
        let service = EvaluationService::new(farm.store.clone());

        let err = service.get_evaluation(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn unit_evaluations_are_listed_newest_first() {
        let farm = farm().await;
        let sector = farm.add_sector("Setor 1").await;
        let service = EvaluationService::new(farm.store.clone());

        let first = service
            .create_evaluation(
                Uuid::new_v4(),
                evaluation_input(sector.unit_ref(), reference_points()),
            )
            .await
            .unwrap();
        let second = service
            .create_evaluation(
                Uuid::new_v4(),
                evaluation_input(sector.unit_ref(), vec![sector_point(1, 2.0)]),
            )
            .await
            .unwrap();

        let listed = service
            .list_unit_evaluations(sector.unit_ref())
            .await
            .unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|e| e.evaluation.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(listed[1].classification.cuc.value, 88.0);
    }

    #[tokio::test]
    async fn listing_an_unknown_unit_is_target_not_found() {
        let farm = farm().await;
        let service = EvaluationService::new(farm.store.clone());

        let err = service
            .list_unit_evaluations(UnitRef::CentralPivot(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TargetNotFound(_)));
    }
}

// =============================================================================
// Deletion
// =============================================================================

mod delete {
    use super::*;

    /// Evaluation with a comment that carries one photo
    async fn evaluated_sector(farm: &Farm) -> Uuid {
        let sector = farm.add_sector("Setor 1").await;
        let service = EvaluationService::new(farm.store.clone());

        let mut input = evaluation_input(sector.unit_ref(), reference_points());
        input.comment = Some("Coletor 3 danificado".to_string());
        input.recommendations = Some("Trocar emissores".to_string());
        let created = service
            .create_evaluation(Uuid::new_v4(), input)
            .await
            .unwrap();

        let comments = farm.store.list_comments(created.id).await.unwrap();
        farm.store
            .attach_photo(comments[0].id, photo())
            .await
            .unwrap();

        created.id
    }

    #[tokio::test]
    async fn owner_deletes_evaluation_and_children() {
        let farm = farm().await;
        let evaluation_id = evaluated_sector(&farm).await;
        let service = EvaluationService::new(farm.store.clone());
        assert_eq!(farm.store.photo_count().await, 1);

        service
            .delete_evaluation(farm.owner_id, evaluation_id)
            .await
            .unwrap();

        assert_eq!(farm.store.evaluation_count().await, 0);
        assert_eq!(farm.store.point_count().await, 0);
        assert_eq!(farm.store.comment_count().await, 0);
        assert_eq!(farm.store.photo_count().await, 0);
        assert!(matches!(
            service.get_evaluation(evaluation_id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn other_users_are_forbidden() {
        let farm = farm().await;
        let evaluation_id = evaluated_sector(&farm).await;
        let service = EvaluationService::new(farm.store.clone());

        let err = service
            .delete_evaluation(Uuid::new_v4(), evaluation_id)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(farm.store.evaluation_count().await, 1);
        assert_eq!(farm.store.point_count().await, 5);
        assert_eq!(farm.store.photo_count().await, 1);
    }

    #[tokio::test]
    async fn unknown_evaluation_is_not_found() {
        let farm = farm().await;
        let service = EvaluationService::new(farm.store.clone());

        let err = service
            .delete_evaluation(farm.owner_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn failure_partway_leaves_everything_in_place() {
        for fail_point in [
            FailPoint::DeleteCommentPhotos,
            FailPoint::DeleteComments,
            FailPoint::DeleteSectorPoints,
            FailPoint::DeletePivotPoints,
            FailPoint::DeleteEvaluation,
            FailPoint::Commit,
        ] {
            let farm = farm().await;
            let evaluation_id = evaluated_sector(&farm).await;
            let service = EvaluationService::new(farm.store.clone());

            farm.store.fail_on(fail_point).await;
            let err = service
                .delete_evaluation(farm.owner_id, evaluation_id)
                .await
                .unwrap_err();
            assert!(
                matches!(err, AppError::OperationFailed(_)),
                "{:?}: {:?}",
                fail_point,
                err
            );

            assert_eq!(farm.store.evaluation_count().await, 1);
            assert_eq!(farm.store.point_count().await, 5);
            assert_eq!(farm.store.comment_count().await, 2);
            assert_eq!(farm.store.photo_count().await, 1);

            farm.store.clear_failure().await;
            service
                .delete_evaluation(farm.owner_id, evaluation_id)
                .await
                .unwrap();
            assert_eq!(farm.store.evaluation_count().await, 0);
        }
    }
}
